// ---------------------------------------------------------------------------
// Tree state over a shared virtual filesystem
// ---------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};

use arbor_vfs::path::{base_name, normalize, path_depth, rebase};
use arbor_vfs::{DirEntry, EntryKind, SharedFs};

use crate::config::{RenameCallback, SelectionCallback, TreeConfig};
use crate::entry::EntryHandle;
use crate::error::TreeError;
use crate::flat::{FlatEntry, FlatRow, SortFn, default_sort};
use crate::identity::{IdentityRegistry, StableId};
use crate::moves::{PlannedMove, find_collisions, plan_moves, validate_move};
use crate::selection::SelectionSpans;

// ---------------------------------------------------------------------------
// Memoized views
// ---------------------------------------------------------------------------

struct ChildListing {
	fs_version: u64,
	sort_version: u64,
	children: Vec<DirEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FlatKey {
	fs_version: u64,
	expanded_version: u64,
	sort_version: u64,
}

struct FlatCache {
	key: FlatKey,
	rows: Vec<FlatRow>,
}

// ---------------------------------------------------------------------------
// TreeController
// ---------------------------------------------------------------------------

/// Expand, selection and focus state over a [`SharedFs`], plus the derived
/// flat order of visible entries.
///
/// All state is keyed by [`StableId`], so renames made through
/// [`rename_dir_ent`](Self::rename_dir_ent) or
/// [`move_selected_dir_ents_to_path`](Self::move_selected_dir_ents_to_path)
/// carry expansion, selection and focus along with the entries.
///
/// Every public mutation runs as a batch. Derived views are recomputed and
/// callbacks fire only when the outermost batch completes, followed by a
/// reclamation tick.
pub struct TreeController<T> {
	fs: SharedFs<T>,
	registry: IdentityRegistry,
	base: String,
	base_id: StableId,
	sort: SortFn,
	sort_version: u64,
	on_selection: Option<SelectionCallback>,
	on_rename: Option<RenameCallback>,

	expanded: HashSet<StableId>,
	expanded_version: u64,
	selection: SelectionSpans,
	focused: Option<StableId>,

	children_cache: HashMap<String, ChildListing>,
	flat: Option<FlatCache>,

	batch_depth: usize,
	pending_renames: Vec<(String, String)>,
	notified_selection: Vec<String>,
}

impl<T> TreeController<T> {
	// -- Constructor ------------------------------------------------------

	pub fn new(fs: SharedFs<T>, config: TreeConfig) -> Self {
		let TreeConfig {
			base,
			sort,
			on_selection,
			on_rename,
			selected_paths,
		} = config;

		let base = normalize(&base).to_string();
		let mut registry = IdentityRegistry::new();
		let base_id = registry.obtain_id(&base);
		let sort: SortFn = match sort {
			Some(sort) => sort,
			None => Box::new(default_sort),
		};

		let mut controller = Self {
			fs,
			registry,
			base,
			base_id,
			sort,
			sort_version: 0,
			on_selection,
			on_rename,
			expanded: HashSet::new(),
			expanded_version: 0,
			selection: SelectionSpans::default(),
			focused: None,
			children_cache: HashMap::new(),
			flat: None,
			batch_depth: 0,
			pending_renames: Vec::new(),
			notified_selection: Vec::new(),
		};

		if let Some(paths) = selected_paths {
			controller.apply_selected_paths(&paths);
		}
		controller.notified_selection = controller.selected_paths();
		controller.tick();
		controller
	}

	// -- Accessors --------------------------------------------------------

	pub fn fs(&self) -> &SharedFs<T> {
		&self.fs
	}

	pub fn base(&self) -> &str {
		&self.base
	}

	pub fn base_id(&self) -> StableId {
		self.base_id
	}

	pub fn registry(&self) -> &IdentityRegistry {
		&self.registry
	}

	pub fn focused_id(&self) -> Option<StableId> {
		self.focused
	}

	pub fn is_expanded(&self, id: StableId) -> bool {
		id == self.base_id || self.expanded.contains(&id)
	}

	pub fn id_to_path(&self, id: StableId) -> Result<String, TreeError> {
		self.registry.id_to_path(id).map(str::to_string)
	}

	pub fn path_to_id(&mut self, path: &str, assert_existing: bool) -> Result<StableId, TreeError> {
		self.registry.path_to_id(normalize(path), assert_existing)
	}

	pub fn entry(&mut self, id: StableId) -> EntryHandle<'_, T> {
		EntryHandle::new(self, id)
	}

	// -- Filesystem passthrough -------------------------------------------

	/// Raw existence check; see [`VirtualFs::exists`](arbor_vfs::VirtualFs::exists).
	pub fn exists(&self, path: &str) -> bool {
		self.fs.borrow().exists(path)
	}

	pub fn readdir(&self, path: &str) -> Result<Vec<String>, TreeError> {
		Ok(self.fs.borrow().readdir(path)?)
	}

	pub fn rename(&mut self, old_path: &str, new_path: &str) -> Result<(), TreeError> {
		self.rename_dir_ent(old_path, new_path)
	}

	// -- Batching ---------------------------------------------------------

	/// Run `f` as one unit of work. Nested batches fold into the outermost.
	pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
		self.batch_depth += 1;
		let result = f(self);
		self.batch_depth -= 1;
		if self.batch_depth == 0 {
			self.flush();
		}
		result
	}

	/// Pick up filesystem changes made behind the controller's back and
	/// notify callbacks.
	pub fn refresh(&mut self) {
		self.batch(|_| ());
	}

	/// Deferred-work hook: reclaim identities nobody re-acquired since they
	/// were released.
	pub fn tick(&mut self) {
		let reclaimed = self.registry.reclaim_pending();
		if reclaimed > 0 {
			tracing::trace!("reclaimed {} identities", reclaimed);
		}
	}

	fn flush(&mut self) {
		self.refresh_flat();

		let renames = std::mem::take(&mut self.pending_renames);
		if let Some(callback) = self.on_rename.as_mut() {
			for (old_path, new_path) in &renames {
				callback(old_path.as_str(), new_path.as_str());
			}
		}

		let selected = self.selected_paths();
		if selected != self.notified_selection {
			if let Some(callback) = self.on_selection.as_mut() {
				callback(selected.as_slice());
			}
			self.notified_selection = selected;
		}

		self.tick();
	}

	// -- Derived views ----------------------------------------------------

	fn sorted_children(&mut self, dir: &str) -> Vec<DirEntry> {
		let fs_version = self.fs.borrow().version();
		if let Some(listing) = self.children_cache.get(dir) {
			if listing.fs_version == fs_version && listing.sort_version == self.sort_version {
				return listing.children.clone();
			}
		}

		let listed = self.fs.borrow().readdir_with_types(dir);
		let mut children = match listed {
			Ok(children) => children,
			Err(e) => {
				tracing::debug!("no children listed for {:?}: {}", dir, e);
				Vec::new()
			}
		};
		children.sort_by(|a, b| (self.sort)(a, b));

		self.children_cache.insert(
			dir.to_string(),
			ChildListing {
				fs_version,
				sort_version: self.sort_version,
				children: children.clone(),
			},
		);
		children
	}

	fn flat_key(&self) -> FlatKey {
		FlatKey {
			fs_version: self.fs.borrow().version(),
			expanded_version: self.expanded_version,
			sort_version: self.sort_version,
		}
	}

	fn refresh_flat(&mut self) {
		let key = self.flat_key();
		if self.flat.as_ref().is_some_and(|cache| cache.key == key) {
			return;
		}

		let base_depth = path_depth(&self.base);
		let mut rows: Vec<FlatRow> = Vec::new();
		let mut listed: HashSet<String> = HashSet::new();
		let mut stack: Vec<(String, EntryKind)> = vec![(self.base.clone(), EntryKind::Dir)];

		while let Some((path, kind)) = stack.pop() {
			let id = self.registry.obtain_id(&path);
			if kind == EntryKind::Dir && self.is_expanded(id) {
				let children = self.sorted_children(&path);
				stack.extend(
					children
						.into_iter()
						.rev()
						.map(|child| (child.path, child.kind)),
				);
				listed.insert(path.clone());
			}
			rows.push(FlatRow {
				id,
				depth: path_depth(&path).saturating_sub(base_depth),
				path,
				kind,
			});
		}

		self.children_cache.retain(|dir, _| listed.contains(dir));
		tracing::debug!("flat order recomputed: {} rows", rows.len());

		// Rows of the previous order let go only after the new order has
		// re-acquired its ids, so unchanged rows keep theirs.
		if let Some(previous) = self.flat.replace(FlatCache { key, rows }) {
			for row in previous.rows {
				self.registry.release_id(row.id);
			}
		}
	}

	/// Visible rows in preorder, base first.
	pub fn flat_rows(&mut self) -> &[FlatRow] {
		self.refresh_flat();
		match self.flat.as_ref() {
			Some(cache) => cache.rows.as_slice(),
			None => &[],
		}
	}

	pub fn flat_order(&mut self) -> Vec<StableId> {
		self.flat_rows().iter().map(|row| row.id).collect()
	}

	pub fn selected_ids(&mut self) -> Vec<StableId> {
		let order = self.flat_order();
		self.selection.resolve(&order)
	}

	pub fn selected_paths(&mut self) -> Vec<String> {
		self.selected_ids()
			.into_iter()
			.filter_map(|id| self.registry.id_to_path(id).ok().map(str::to_string))
			.collect()
	}

	pub fn flat_entries(&mut self) -> Vec<FlatEntry> {
		let selected: HashSet<StableId> = self.selected_ids().into_iter().collect();
		let Some(cache) = self.flat.as_ref() else {
			return Vec::new();
		};
		cache
			.rows
			.iter()
			.map(|row| FlatEntry {
				id: row.id,
				kind: row.kind,
				path: row.path.clone(),
				depth: row.depth,
				name: base_name(&row.path).to_string(),
				selected: selected.contains(&row.id),
				focused: self.focused == Some(row.id),
				expanded: (row.kind == EntryKind::Dir).then(|| self.is_expanded(row.id)),
			})
			.collect()
	}

	pub fn flat_entry(&mut self, id: StableId) -> Option<FlatEntry> {
		self.flat_entries().into_iter().find(|entry| entry.id == id)
	}

	pub fn set_sort(&mut self, sort: SortFn) {
		self.batch(|c| {
			c.sort = sort;
			c.sort_version += 1;
		});
	}

	// -- Expand / collapse ------------------------------------------------

	pub fn expand(&mut self, id: StableId) -> Result<(), TreeError> {
		self.batch(|c| c.expand_id(id))
	}

	pub fn collapse(&mut self, id: StableId) {
		self.batch(|c| c.collapse_id(id));
	}

	fn expand_id(&mut self, id: StableId) -> Result<(), TreeError> {
		if self.is_expanded(id) {
			return Ok(());
		}
		self.registry.freeze_id(id)?;
		self.expanded.insert(id);
		self.expanded_version += 1;
		Ok(())
	}

	fn collapse_id(&mut self, id: StableId) {
		if self.expanded.remove(&id) {
			self.registry.release_id(id);
			self.expanded_version += 1;
		}
	}

	// -- Selection --------------------------------------------------------

	pub fn select(&mut self, id: StableId) -> Result<(), TreeError> {
		self.batch(|c| c.select_id(id))
	}

	pub fn shift_select(&mut self, id: StableId) -> Result<(), TreeError> {
		self.batch(|c| c.shift_select_id(id))
	}

	pub fn deselect(&mut self, id: StableId) {
		self.batch(|c| c.deselect_id(id));
	}

	pub fn reset_selection(&mut self) {
		self.batch(|c| c.clear_selection());
	}

	/// Alias kept for presentation adapters that speak in dir-ent terms.
	pub fn reset_selected_dir_ent_ids(&mut self) {
		self.reset_selection();
	}

	/// Replace the selection with one span per path that can be resolved.
	pub fn set_selected_paths(&mut self, paths: &[String]) {
		self.batch(|c| c.apply_selected_paths(paths));
	}

	fn select_id(&mut self, id: StableId) -> Result<(), TreeError> {
		self.registry.freeze_id(id)?;
		self.selection.select(id);
		Ok(())
	}

	fn shift_select_id(&mut self, id: StableId) -> Result<(), TreeError> {
		self.registry.freeze_id(id)?;
		if let Some(previous) = self.selection.shift_select(id) {
			self.registry.release_id(previous);
		}
		Ok(())
	}

	fn deselect_id(&mut self, id: StableId) {
		for _ in 0..self.selection.deselect(id) {
			self.registry.release_id(id);
		}
	}

	fn clear_selection(&mut self) {
		for id in self.selection.clear() {
			self.registry.release_id(id);
		}
	}

	fn apply_selected_paths(&mut self, paths: &[String]) {
		self.clear_selection();
		for path in paths {
			let id = match self.registry.path_to_id(normalize(path), false) {
				Ok(id) => id,
				Err(e) => {
					tracing::debug!("cannot select {:?}: {}", path, e);
					continue;
				}
			};
			if self.select_id(id).is_err() {
				tracing::debug!("cannot select {:?}: identity vanished", path);
			}
		}
	}

	// -- Focus ------------------------------------------------------------

	pub fn focus(&mut self, id: StableId) -> Result<(), TreeError> {
		self.batch(|c| c.focus_id(id))
	}

	pub fn blur(&mut self, id: StableId) {
		self.batch(|c| {
			if c.focused == Some(id) {
				c.focused = None;
				c.registry.release_id(id);
			}
		});
	}

	fn focus_id(&mut self, id: StableId) -> Result<(), TreeError> {
		self.registry.freeze_id(id)?;
		if let Some(previous) = self.focused.replace(id) {
			self.registry.release_id(previous);
		}
		Ok(())
	}

	// -- Rename / move ----------------------------------------------------

	/// Rename one entry (and its subtree) and focus it under its new path.
	pub fn rename_dir_ent(&mut self, old_path: &str, new_path: &str) -> Result<(), TreeError> {
		self.batch(|c| c.apply_rename(old_path, new_path))
	}

	fn apply_rename(&mut self, old_path: &str, new_path: &str) -> Result<(), TreeError> {
		let old_path = normalize(old_path).to_string();
		let new_path = normalize(new_path).to_string();

		if !self.fs.borrow().check_rename(&old_path, &new_path)? {
			// Missing source under the lenient policy: the filesystem logs it.
			self.fs.borrow_mut().rename(&old_path, &new_path)?;
			return Ok(());
		}

		self.registry.before_rename(&old_path, &new_path);
		self.fs.borrow_mut().rename(&old_path, &new_path)?;
		// The view root follows its entry when it, or an ancestor, moves.
		self.base = rebase(&self.base, &old_path, &new_path);
		tracing::debug!("renamed {:?} -> {:?}", old_path, new_path);

		let id = self.registry.path_to_id(&new_path, false)?;
		self.pending_renames.push((old_path, new_path));
		self.focus_id(id)
	}

	/// Move every selected entry into the directory `target`.
	///
	/// All destinations are checked before anything is renamed; on any
	/// conflict the store and tree state are left untouched. Entries whose
	/// selected ancestor is moving too travel with that ancestor.
	pub fn move_selected_dir_ents_to_path(&mut self, target: &str) -> Result<(), TreeError> {
		let target = normalize(target).to_string();
		let selected = self.selected_paths();
		if selected.is_empty() {
			return Ok(());
		}

		validate_move(&selected, &target)?;
		let plan = plan_moves(&selected, &target);

		{
			let fs = self.fs.borrow();
			let collisions = find_collisions(&plan, |path| fs.exists(path));
			if !collisions.is_empty() {
				return Err(TreeError::PathsAlreadyExist(collisions));
			}
			for planned in plan.iter().filter(|m| m.should_rename) {
				fs.check_rename(&planned.source, &planned.destination)?;
			}
		}

		tracing::debug!("moving {} selected entries into {:?}", plan.len(), target);
		self.batch(|c| c.apply_move(&plan, &target))
	}

	fn apply_move(&mut self, plan: &[PlannedMove], target: &str) -> Result<(), TreeError> {
		for planned in plan.iter().filter(|m| m.should_rename) {
			self.apply_rename(&planned.source, &planned.destination)?;
		}
		let target_id = self.registry.path_to_id(target, false)?;
		self.expand_id(target_id)
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
