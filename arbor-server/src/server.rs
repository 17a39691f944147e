// ---------------------------------------------------------------------------
// TreeServer: JSON-RPC dispatcher
// ---------------------------------------------------------------------------
//
// Routes incoming JSON-RPC 2.0 requests (NDJSON over stdin) to one shared
// store and the tree controller viewing it. Tree callbacks and store events
// queued while a request runs go out as notifications just before its
// response.
// ---------------------------------------------------------------------------

use std::cell::RefCell;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

use arbor_tree::{StableId, TreeConfig, TreeController};
use arbor_vfs::path::normalize;
use arbor_vfs::{RenamePolicy, SharedFs, VirtualFs};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::protocol::*;
use crate::transport::NdjsonTransport;

type Outbox = Rc<RefCell<Vec<TreeNotification>>>;

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

pub struct TreeServer<W: Write = io::Stdout> {
	transport: NdjsonTransport<W>,
	config: ServerConfig,
	fs: SharedFs<String>,
	tree: TreeController<String>,
	outbox: Outbox,
}

impl<W: Write> TreeServer<W> {
	pub fn new(transport: NdjsonTransport<W>, config: ServerConfig) -> Self {
		let outbox: Outbox = Rc::new(RefCell::new(Vec::new()));
		let (fs, tree) = build(&config, &outbox);
		Self {
			transport,
			config,
			fs,
			tree,
			outbox,
		}
	}

	pub fn into_transport(self) -> NdjsonTransport<W> {
		self.transport
	}

	/// Main loop: read JSON-RPC messages from stdin until EOF.
	pub fn run(&mut self) -> Result<(), ServerError> {
		let stdin = io::stdin();
		for line_result in stdin.lock().lines() {
			let line = line_result?;
			self.handle_line(&line);
		}
		Ok(())
	}

	pub fn handle_line(&mut self, line: &str) {
		let trimmed = line.trim();
		if trimmed.is_empty() {
			return;
		}
		match serde_json::from_str::<JsonRpcRequest>(trimmed) {
			Ok(req) => self.dispatch(req),
			Err(e) => {
				tracing::warn!("Parse error: {}", e);
				self.transport
					.write_error(0, INTERNAL_ERROR, "Parse error: invalid JSON", None);
			}
		}
	}

	// ── Dispatch ──────────────────────────────────────────────────────────

	fn dispatch(&mut self, req: JsonRpcRequest) {
		let id = req.id;
		let params = req.params;
		tracing::debug!(id, method = %req.method, "request");

		let result = match req.method.as_str() {
			"initialize" => self.handle_initialize(params),

			// -- Filesystem ----------------------------------------------
			"fs/exists" => parse_params(params).map(|p: PathParams| {
				json!({ "exists": self.tree.exists(normalize(&p.path)) })
			}),
			"fs/readdir" => self.handle_readdir(params),
			"fs/mkdir" => self.handle_mkdir(params),
			"fs/writeFile" => self.handle_write_file(params),
			"fs/readFile" => self.handle_read_file(params),
			"fs/rm" => self.handle_rm(params),
			"fs/rename" => self.handle_fs_rename(params),
			"fs/snapshot" => Ok(json!({ "entries": self.fs.borrow().snapshot() })),
			"fs/metrics" => serde_json::to_value(self.fs.borrow().metrics()).map_err(Into::into),

			// -- Tree ----------------------------------------------------
			"tree/entries" => Ok(self.entries()),
			"tree/expand" => self.with_id(params, |tree, id| tree.expand(id)),
			"tree/collapse" => self.with_id(params, |tree, id| {
				tree.collapse(id);
				Ok(())
			}),
			"tree/select" => self.with_id(params, |tree, id| tree.select(id)),
			"tree/shiftSelect" => self.with_id(params, |tree, id| tree.shift_select(id)),
			"tree/deselect" => self.with_id(params, |tree, id| {
				tree.deselect(id);
				Ok(())
			}),
			"tree/resetSelection" => {
				self.tree.reset_selected_dir_ent_ids();
				Ok(json!({}))
			}
			"tree/setSelectedPaths" => parse_params(params).map(|p: SelectedPathsParams| {
				self.tree.set_selected_paths(&p.paths);
				json!({ "paths": self.tree.selected_paths() })
			}),
			"tree/focus" => self.with_id(params, |tree, id| tree.focus(id)),
			"tree/blur" => self.with_id(params, |tree, id| {
				tree.blur(id);
				Ok(())
			}),
			"tree/rename" => self.handle_tree_rename(params),
			"tree/move" => self.handle_move(params),

			// -- Unknown -------------------------------------------------
			_ => {
				self.transport.write_error(
					id,
					METHOD_NOT_FOUND,
					format!("Unknown method: {}", req.method),
					None,
				);
				return;
			}
		};

		// Store changes made through fs/* reach the tree here.
		self.tree.refresh();
		self.flush_notifications();

		match result {
			Ok(value) => self.transport.write_response(id, value),
			Err(e) => self.transport.write_error(
				id,
				e.rpc_code(),
				e.to_string(),
				Some(e.to_json_rpc_error()),
			),
		}
	}

	fn flush_notifications(&mut self) {
		let queued: Vec<TreeNotification> = self.outbox.borrow_mut().drain(..).collect();
		for notification in queued {
			match serde_json::to_value(&notification) {
				Ok(params) => self
					.transport
					.write_notification(notification.method(), params),
				Err(e) => tracing::error!("Failed to serialize notification: {}", e),
			}
		}

		let events = self.fs.borrow_mut().drain_events();
		if !events.is_empty() {
			self.transport
				.write_notification("fs/changed", json!({ "events": events }));
		}
	}

	fn with_id<F>(&mut self, params: serde_json::Value, f: F) -> Result<serde_json::Value, ServerError>
	where
		F: FnOnce(&mut TreeController<String>, StableId) -> Result<(), arbor_tree::TreeError>,
	{
		let p: IdParams = parse_params(params)?;
		f(&mut self.tree, StableId::from_raw(p.id))?;
		Ok(json!({}))
	}

	// ── Initialize ────────────────────────────────────────────────────────

	fn handle_initialize(&mut self, params: serde_json::Value) -> Result<serde_json::Value, ServerError> {
		let p: InitializeParams = if params.is_null() {
			InitializeParams::default()
		} else {
			parse_params(params)?
		};

		let mut config = self.config.clone();
		if let Some(base) = p.base {
			config.base = base;
		}
		if let Some(limits) = p.limits {
			let current = &mut config.options.limits;
			current.max_path_depth = limits.max_path_depth.unwrap_or(current.max_path_depth);
			current.max_name_length = limits.max_name_length.unwrap_or(current.max_name_length);
			current.max_node_count = limits.max_node_count.unwrap_or(current.max_node_count);
		}
		if let Some(strict) = p.strict_rename {
			config.options.rename_policy = if strict {
				RenamePolicy::Strict
			} else {
				RenamePolicy::Lenient
			};
		}

		self.outbox.borrow_mut().clear();
		let (fs, tree) = build(&config, &self.outbox);
		self.fs = fs;
		self.tree = tree;
		self.config = config;
		tracing::info!(base = %self.tree.base(), "store initialized");

		Ok(json!({
			"base": self.tree.base(),
			"baseId": self.tree.base_id(),
		}))
	}

	// ── Filesystem ────────────────────────────────────────────────────────

	fn handle_readdir(&mut self, params: serde_json::Value) -> Result<serde_json::Value, ServerError> {
		let p: PathParams = parse_params(params)?;
		let mut entries = self.fs.borrow().readdir_with_types(&p.path)?;
		entries.sort_by(|a, b| a.path.cmp(&b.path));
		Ok(json!({ "entries": entries }))
	}

	fn handle_mkdir(&mut self, params: serde_json::Value) -> Result<serde_json::Value, ServerError> {
		let p: MkdirParams = parse_params(params)?;
		self.fs
			.borrow_mut()
			.mkdir(&p.path, p.recursive.unwrap_or(false))?;
		Ok(json!({}))
	}

	fn handle_write_file(&mut self, params: serde_json::Value) -> Result<serde_json::Value, ServerError> {
		let p: WriteFileParams = parse_params(params)?;
		self.fs.borrow_mut().write_file(&p.path, p.content)?;
		Ok(json!({}))
	}

	fn handle_read_file(&mut self, params: serde_json::Value) -> Result<serde_json::Value, ServerError> {
		let p: PathParams = parse_params(params)?;
		let content = self.fs.borrow().read_file(&p.path)?;
		Ok(json!({ "content": content }))
	}

	fn handle_rm(&mut self, params: serde_json::Value) -> Result<serde_json::Value, ServerError> {
		let p: RmParams = parse_params(params)?;
		self.fs.borrow_mut().rm(
			&p.path,
			p.force.unwrap_or(false),
			p.recursive.unwrap_or(false),
		)?;
		Ok(json!({}))
	}

	/// Raw store rename: the tree sees it as an external change, so state
	/// attached to the old paths does not follow.
	fn handle_fs_rename(&mut self, params: serde_json::Value) -> Result<serde_json::Value, ServerError> {
		let p: RenameParams = parse_params(params)?;
		self.fs.borrow_mut().rename(&p.old_path, &p.new_path)?;
		Ok(json!({}))
	}

	// ── Tree ──────────────────────────────────────────────────────────────

	fn entries(&mut self) -> serde_json::Value {
		json!({
			"entries": self.tree.flat_entries(),
			"selectedPaths": self.tree.selected_paths(),
			"focusedId": self.tree.focused_id(),
		})
	}

	fn handle_tree_rename(&mut self, params: serde_json::Value) -> Result<serde_json::Value, ServerError> {
		let p: RenameParams = parse_params(params)?;
		self.tree.rename_dir_ent(&p.old_path, &p.new_path)?;
		Ok(json!({}))
	}

	fn handle_move(&mut self, params: serde_json::Value) -> Result<serde_json::Value, ServerError> {
		let p: MoveParams = parse_params(params)?;
		self.tree.move_selected_dir_ents_to_path(&p.target)?;
		Ok(json!({ "paths": self.tree.selected_paths() }))
	}
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn build(config: &ServerConfig, outbox: &Outbox) -> (SharedFs<String>, TreeController<String>) {
	let mut store = VirtualFs::with_options(config.options.clone());
	if !normalize(&config.base).is_empty() {
		if let Err(e) = store.mkdir(&config.base, true) {
			tracing::warn!("cannot create base {:?}: {}", config.base, e);
		}
		store.drain_events();
	}
	let fs = store.into_shared();

	let selection_sink = Rc::clone(outbox);
	let rename_sink = Rc::clone(outbox);
	let tree_config = TreeConfig::new()
		.with_base(config.base.clone())
		.on_selection(move |paths| {
			selection_sink
				.borrow_mut()
				.push(TreeNotification::SelectionChanged {
					paths: paths.to_vec(),
				})
		})
		.on_rename(move |old_path, new_path| {
			rename_sink.borrow_mut().push(TreeNotification::Renamed {
				old_path: old_path.to_string(),
				new_path: new_path.to_string(),
			})
		});

	let tree = TreeController::new(Rc::clone(&fs), tree_config);
	(fs, tree)
}

fn parse_params<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, ServerError> {
	serde_json::from_value(params).map_err(|e| ServerError::InvalidParams(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
