use std::cmp::Ordering;

use arbor_vfs::{DirEntry, EntryKind};
use serde::Serialize;

use crate::identity::StableId;

/// Comparator deciding the order of a directory's children.
pub type SortFn = Box<dyn Fn(&DirEntry, &DirEntry) -> Ordering>;

/// Case-insensitive path order, falling back to byte order so that paths
/// differing only in case still compare deterministically.
pub fn case_insensitive_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Directories before files, then case-insensitive by path.
pub fn default_sort(a: &DirEntry, b: &DirEntry) -> Ordering {
    match (a.is_dir(), b.is_dir()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => case_insensitive_cmp(&a.path, &b.path),
    }
}

/// One visible position in the flat order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatRow {
    pub id: StableId,
    pub path: String,
    pub kind: EntryKind,
    /// Ancestor count relative to the controller's base path.
    pub depth: usize,
}

/// Read-only projection of a visible entry, rebuilt on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatEntry {
    pub id: StableId,
    pub kind: EntryKind,
    pub path: String,
    pub depth: usize,
    pub name: String,
    pub selected: bool,
    pub focused: bool,
    /// `None` for files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
}
