// ---------------------------------------------------------------------------
// In-memory entry store keyed by normalized path
// ---------------------------------------------------------------------------

use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::VfsError;
use crate::path::{
	ROOT, VfsLimits, ancestor_paths, base_name, is_ancestor, normalize, parent_path, rebase,
	validate_path,
};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
	Dir,
	File,
}

impl EntryKind {
	pub fn as_str(&self) -> &str {
		match self {
			Self::Dir => "dir",
			Self::File => "file",
		}
	}
}

/// Readable cell holding a File's value.
///
/// Every clone observes the same value; `VirtualFs::write_file` on an
/// existing File updates the value in place rather than swapping cells.
pub struct FileCell<T>(Rc<RefCell<T>>);

impl<T> FileCell<T> {
	fn new(value: T) -> Self {
		Self(Rc::new(RefCell::new(value)))
	}

	pub fn borrow(&self) -> Ref<'_, T> {
		self.0.borrow()
	}

	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.0.borrow().clone()
	}

	pub fn ptr_eq(a: &Self, b: &Self) -> bool {
		Rc::ptr_eq(&a.0, &b.0)
	}

	fn set(&self, value: T) {
		*self.0.borrow_mut() = value;
	}
}

impl<T> Clone for FileCell<T> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<T: fmt::Debug> fmt::Debug for FileCell<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("FileCell").field(&*self.0.borrow()).finish()
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
	pub path: String,
	pub kind: EntryKind,
}

impl DirEntry {
	pub fn name(&self) -> &str {
		base_name(&self.path)
	}

	pub fn is_dir(&self) -> bool {
		self.kind == EntryKind::Dir
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VfsEvent {
	Write { path: String, created: bool },
	Mkdir { path: String },
	Remove { path: String },
	Rename { from: String, to: String },
}

/// What `rename` does when its source path is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenamePolicy {
	/// Log a warning and leave the store untouched.
	#[default]
	Lenient,
	/// Fail with `PathNotFound`.
	Strict,
}

#[derive(Debug, Clone, Default)]
pub struct VfsOptions {
	pub limits: VfsLimits,
	pub rename_policy: RenamePolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResult {
	pub node_count: usize,
	pub file_count: usize,
	pub directory_count: usize,
}

#[derive(Debug)]
enum Entry<T> {
	Dir,
	File(FileCell<T>),
}

impl<T> Entry<T> {
	fn kind(&self) -> EntryKind {
		match self {
			Self::Dir => EntryKind::Dir,
			Self::File(_) => EntryKind::File,
		}
	}
}

/// A filesystem shared between several readers (e.g. two tree controllers).
pub type SharedFs<T> = Rc<RefCell<VirtualFs<T>>>;

// ---------------------------------------------------------------------------
// VirtualFs
// ---------------------------------------------------------------------------

pub struct VirtualFs<T> {
	entries: HashMap<String, Entry<T>>,
	options: VfsOptions,
	version: u64,
	pending_events: Vec<VfsEvent>,
}

impl<T> Default for VirtualFs<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> VirtualFs<T> {
	// -- Constructor ------------------------------------------------------

	pub fn new() -> Self {
		Self::with_options(VfsOptions::default())
	}

	pub fn with_options(options: VfsOptions) -> Self {
		let mut entries = HashMap::new();
		entries.insert(ROOT.to_string(), Entry::Dir);
		Self {
			entries,
			options,
			version: 0,
			pending_events: Vec::new(),
		}
	}

	pub fn into_shared(self) -> SharedFs<T> {
		Rc::new(RefCell::new(self))
	}

	pub fn options(&self) -> &VfsOptions {
		&self.options
	}

	/// Structure version: bumped whenever an entry is created, removed or
	/// relabeled. Value-only file updates leave it unchanged.
	pub fn version(&self) -> u64 {
		self.version
	}

	// -- Helpers (private) ------------------------------------------------

	fn assert_valid_path(&self, path: &str) -> Result<String, VfsError> {
		let normalized = normalize(path);
		if let Some(err) = validate_path(normalized, &self.options.limits) {
			return Err(VfsError::InvalidPath(format!("{}: {}", err, path)));
		}
		Ok(normalized.to_string())
	}

	fn assert_node_limit(&self, additional: usize) -> Result<(), VfsError> {
		let max = self.options.limits.max_node_count;
		if self.entries.len().saturating_add(additional) > max {
			return Err(VfsError::LimitExceeded(format!(
				"Maximum node count exceeded ({})",
				max
			)));
		}
		Ok(())
	}

	fn ensure_parent_dir(&self, path: &str) -> Result<(), VfsError> {
		let parent = parent_path(path);
		match self.entries.get(parent) {
			None => Err(VfsError::PathNotFound(format!(
				"Parent directory does not exist: {}",
				parent
			))),
			Some(Entry::File(_)) => Err(VfsError::NotADirectory(parent.to_string())),
			Some(Entry::Dir) => Ok(()),
		}
	}

	fn get_entry(&self, path: &str) -> Result<&Entry<T>, VfsError> {
		self.entries
			.get(path)
			.ok_or_else(|| VfsError::PathNotFound(path.to_string()))
	}

	fn get_direct_children(&self, dir_path: &str) -> Vec<String> {
		self.entries
			.keys()
			.filter(|key| key.as_str() != dir_path && parent_path(key) == dir_path)
			.cloned()
			.collect()
	}

	fn get_descendants(&self, dir_path: &str) -> Vec<String> {
		self.entries
			.keys()
			.filter(|key| is_ancestor(key, dir_path))
			.cloned()
			.collect()
	}

	fn touch(&mut self, event: VfsEvent) {
		self.version += 1;
		self.pending_events.push(event);
	}

	// -- Queries ----------------------------------------------------------

	/// Raw lookup: `path` is used exactly as given, without normalization.
	/// Callers holding user input should run it through
	/// [`normalize`](crate::path::normalize) first; `"/a"` and `"a"` are
	/// different keys here.
	pub fn exists(&self, path: &str) -> bool {
		self.entries.contains_key(path)
	}

	pub fn get_type(&self, path: &str) -> Result<EntryKind, VfsError> {
		let normalized = normalize(path);
		Ok(self.get_entry(normalized)?.kind())
	}

	/// Immediate children of `path` as full paths, unsorted.
	pub fn readdir(&self, path: &str) -> Result<Vec<String>, VfsError> {
		let normalized = normalize(path);
		self.get_entry(normalized)?;
		Ok(self.get_direct_children(normalized))
	}

	/// Immediate children of `path` with their kinds, unsorted.
	pub fn readdir_with_types(&self, path: &str) -> Result<Vec<DirEntry>, VfsError> {
		let normalized = normalize(path);
		self.get_entry(normalized)?;
		let mut result = Vec::new();
		for child in self.get_direct_children(normalized) {
			let kind = self.get_entry(&child)?.kind();
			result.push(DirEntry { path: child, kind });
		}
		Ok(result)
	}

	pub fn read_file(&self, path: &str) -> Result<T, VfsError>
	where
		T: Clone,
	{
		Ok(self.file_cell(path)?.get())
	}

	/// Shared handle to a File's value cell.
	pub fn file_cell(&self, path: &str) -> Result<FileCell<T>, VfsError> {
		let normalized = normalize(path);
		match self.get_entry(normalized)? {
			Entry::File(cell) => Ok(cell.clone()),
			Entry::Dir => Err(VfsError::NotAFile(normalized.to_string())),
		}
	}

	/// Every stored path with its kind, sorted by path. The root is omitted.
	pub fn snapshot(&self) -> Vec<DirEntry> {
		let mut result: Vec<DirEntry> = self
			.entries
			.iter()
			.filter(|(path, _)| !path.is_empty())
			.map(|(path, entry)| DirEntry {
				path: path.clone(),
				kind: entry.kind(),
			})
			.collect();
		result.sort_by(|a, b| a.path.cmp(&b.path));
		result
	}

	// -- Mutations --------------------------------------------------------

	pub fn mkdir(&mut self, path: &str, recursive: bool) -> Result<(), VfsError> {
		let normalized = self.assert_valid_path(path)?;
		if normalized == ROOT {
			return Ok(());
		}

		match self.entries.get(&normalized) {
			Some(Entry::Dir) => return Ok(()),
			Some(Entry::File(_)) => {
				return Err(VfsError::PathAlreadyExists(format!(
					"A file occupies {}",
					normalized
				)));
			}
			None => {}
		}

		let mut missing: Vec<String> = Vec::new();
		if recursive {
			for ancestor in ancestor_paths(&normalized) {
				match self.entries.get(&ancestor) {
					Some(Entry::Dir) => {}
					Some(Entry::File(_)) => return Err(VfsError::NotADirectory(ancestor)),
					None => missing.push(ancestor),
				}
			}
		} else {
			self.ensure_parent_dir(&normalized)?;
		}
		missing.push(normalized);

		self.assert_node_limit(missing.len())?;
		for dir in missing {
			self.entries.insert(dir.clone(), Entry::Dir);
			self.touch(VfsEvent::Mkdir { path: dir });
		}
		Ok(())
	}

	pub fn write_file(&mut self, path: &str, value: T) -> Result<(), VfsError> {
		let normalized = self.assert_valid_path(path)?;

		match self.entries.get(&normalized) {
			Some(Entry::Dir) => return Err(VfsError::PathIsDirectory(normalized)),
			Some(Entry::File(cell)) => {
				cell.set(value);
				self.pending_events.push(VfsEvent::Write {
					path: normalized,
					created: false,
				});
				return Ok(());
			}
			None => {}
		}

		self.ensure_parent_dir(&normalized)?;
		self.assert_node_limit(1)?;
		self.entries
			.insert(normalized.clone(), Entry::File(FileCell::new(value)));
		self.touch(VfsEvent::Write {
			path: normalized,
			created: true,
		});
		Ok(())
	}

	/// Remove `path` and every descendant in one step.
	///
	/// Without `force` a missing path fails; without `recursive` (and
	/// without `force`) a path with descendants fails.
	pub fn rm(&mut self, path: &str, force: bool, recursive: bool) -> Result<(), VfsError> {
		let normalized = normalize(path).to_string();
		if normalized == ROOT {
			return Err(VfsError::InvalidOperation(
				"Cannot remove root directory".to_string(),
			));
		}

		if !self.entries.contains_key(&normalized) {
			if force {
				return Ok(());
			}
			return Err(VfsError::PathNotFound(normalized));
		}

		let descendants = self.get_descendants(&normalized);
		if !recursive && !force && !descendants.is_empty() {
			return Err(VfsError::DirectoryNotEmpty(normalized));
		}

		for desc in &descendants {
			self.entries.remove(desc);
		}
		self.entries.remove(&normalized);
		self.touch(VfsEvent::Remove { path: normalized });
		Ok(())
	}

	/// Run every check `rename` performs without mutating anything.
	///
	/// Returns `Ok(true)` when the rename would relabel entries and
	/// `Ok(false)` when the source is missing under the lenient policy.
	pub fn check_rename(&self, from: &str, to: &str) -> Result<bool, VfsError> {
		let from = self.assert_valid_path(from)?;
		let to = self.assert_valid_path(to)?;

		if from == ROOT || to == ROOT {
			return Err(VfsError::InvalidOperation(
				"Cannot rename root directory".to_string(),
			));
		}

		if self.entries.contains_key(&to) {
			return Err(VfsError::PathAlreadyExists(to));
		}

		if !self.entries.contains_key(&from) {
			return match self.options.rename_policy {
				RenamePolicy::Strict => Err(VfsError::PathNotFound(from)),
				RenamePolicy::Lenient => Ok(false),
			};
		}

		if is_ancestor(&to, &from) {
			return Err(VfsError::InvalidOperation(format!(
				"Cannot move directory into its own descendant: {} -> {}",
				from, to
			)));
		}

		self.ensure_parent_dir(&to)?;

		for desc in self.get_descendants(&from) {
			let moved = rebase(&desc, &from, &to);
			if let Some(err) = validate_path(&moved, &self.options.limits) {
				return Err(VfsError::InvalidPath(format!("{}: {}", err, moved)));
			}
		}

		Ok(true)
	}

	/// Relabel `from` and every descendant under `to`, keeping kinds and
	/// file cells. Observers see the whole subtree move as one change.
	pub fn rename(&mut self, from: &str, to: &str) -> Result<(), VfsError> {
		if !self.check_rename(from, to)? {
			tracing::warn!(
				"rename source does not exist, ignoring: {} -> {}",
				normalize(from),
				normalize(to)
			);
			return Ok(());
		}

		let from = normalize(from).to_string();
		let to = normalize(to).to_string();

		let mut moving = self.get_descendants(&from);
		moving.push(from.clone());

		let mut relabeled: Vec<(String, Entry<T>)> = Vec::with_capacity(moving.len());
		for old_path in &moving {
			if let Some(entry) = self.entries.remove(old_path) {
				relabeled.push((rebase(old_path, &from, &to), entry));
			}
		}
		self.entries.extend(relabeled);

		self.touch(VfsEvent::Rename { from, to });
		Ok(())
	}

	// -- Events & Metrics -------------------------------------------------

	pub fn drain_events(&mut self) -> Vec<VfsEvent> {
		std::mem::take(&mut self.pending_events)
	}

	pub fn metrics(&self) -> MetricsResult {
		let file_count = self
			.entries
			.values()
			.filter(|e| matches!(e, Entry::File(_)))
			.count();
		MetricsResult {
			node_count: self.entries.len(),
			file_count,
			directory_count: self.entries.len() - file_count,
		}
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
