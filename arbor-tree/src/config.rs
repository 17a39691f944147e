use std::cmp::Ordering;

use arbor_vfs::DirEntry;

use crate::flat::SortFn;

/// Called once per batch with the resolved selection, when it changed.
pub type SelectionCallback = Box<dyn FnMut(&[String])>;
/// Called with `(old_path, new_path)` for every rename a batch performed.
pub type RenameCallback = Box<dyn FnMut(&str, &str)>;

/// Construction-time settings for a [`TreeController`](crate::TreeController).
#[derive(Default)]
pub struct TreeConfig {
    /// Subtree root to display. Defaults to the store root.
    pub base: String,
    /// Replaces the default dirs-first, case-insensitive child order.
    pub sort: Option<SortFn>,
    pub on_selection: Option<SelectionCallback>,
    pub on_rename: Option<RenameCallback>,
    /// Externally controlled selection, applied at construction.
    pub selected_paths: Option<Vec<String>>,
}

impl TreeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    pub fn with_sort(mut self, sort: impl Fn(&DirEntry, &DirEntry) -> Ordering + 'static) -> Self {
        self.sort = Some(Box::new(sort));
        self
    }

    pub fn on_selection(mut self, callback: impl FnMut(&[String]) + 'static) -> Self {
        self.on_selection = Some(Box::new(callback));
        self
    }

    pub fn on_rename(mut self, callback: impl FnMut(&str, &str) + 'static) -> Self {
        self.on_rename = Some(Box::new(callback));
        self
    }

    pub fn with_selected_paths(mut self, paths: Vec<String>) -> Self {
        self.selected_paths = Some(paths);
        self
    }
}
