//! Path ↔ [`StableId`] registry with reference-counted interest.
//!
//! # Overview
//!
//! A [`StableId`] names an entry independently of where it currently lives.
//! The registry binds each tracked path to exactly one id and each bound id
//! to exactly one path. [`IdentityRegistry::before_rename`] moves bindings
//! along with a filesystem rename so that state keyed by id (expansion,
//! selection, focus) follows the entry without any rebasing of its own.
//!
//! # Lifecycle
//!
//! | Call | Interest | Binding |
//! |------|----------|---------|
//! | `obtain_id` (untracked path) | 1 | new |
//! | `obtain_id` (tracked path) | +1 | unchanged |
//! | `freeze_id` | +1 | unchanged |
//! | `path_to_id(_, false)` (untracked path) | 0 | new |
//! | `release_id` | −1 | unchanged |
//! | `reclaim_pending` | unchanged | dropped where interest is still 0 |
//!
//! Dropping to zero interest only queues the id. The binding survives until
//! the next [`reclaim_pending`](IdentityRegistry::reclaim_pending) sweep, so
//! a release followed by a re-acquire of the same path within one unit of
//! work keeps the same id.

use std::collections::HashMap;
use std::fmt;

use arbor_vfs::path::{is_ancestor, rebase};
use serde::Serialize;

use crate::error::TreeError;

// ---------------------------------------------------------------------------
// StableId
// ---------------------------------------------------------------------------

/// Opaque identity token for an entry; survives renames of its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StableId(u32);

impl StableId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// IdentityRegistry
// ---------------------------------------------------------------------------

/// Bidirectional path ↔ id index owned by one tree controller.
///
/// Invariants maintained by all mutating methods:
/// - Every bound path maps to exactly one id and back.
/// - Every bound id has an interest count.
/// - An id sits in the free list only while it is neither bound nor counted.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    path_to_id: HashMap<String, StableId>,
    id_to_path: HashMap<StableId, String>,
    interest: HashMap<StableId, usize>,
    free_ids: Vec<StableId>,
    next_id: u32,
    pending_reclaim: Vec<StableId>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, path: &str, interest: usize) -> StableId {
        let id = self.free_ids.pop().unwrap_or_else(|| {
            let id = StableId(self.next_id);
            self.next_id += 1;
            id
        });
        self.path_to_id.insert(path.to_string(), id);
        self.id_to_path.insert(id, path.to_string());
        self.interest.insert(id, interest);
        if interest == 0 {
            self.pending_reclaim.push(id);
        }
        tracing::trace!("bound {} to {:?}", id, path);
        id
    }

    // -- Acquire / release ------------------------------------------------

    /// Return the id bound to `path`, allocating one if needed, and register
    /// one unit of interest in it. Pair every call with
    /// [`release_id`](Self::release_id).
    pub fn obtain_id(&mut self, path: &str) -> StableId {
        match self.path_to_id.get(path) {
            Some(&id) => {
                *self.interest.entry(id).or_insert(0) += 1;
                id
            }
            None => self.allocate(path, 1),
        }
    }

    /// Register interest in an already-bound id without going through its
    /// path, keeping it alive for non-positional state.
    pub fn freeze_id(&mut self, id: StableId) -> Result<(), TreeError> {
        if !self.id_to_path.contains_key(&id) {
            return Err(TreeError::IdentityNotFound(id.to_string()));
        }
        *self.interest.entry(id).or_insert(0) += 1;
        Ok(())
    }

    /// Drop one unit of interest. At zero the id is queued for reclamation
    /// on the next sweep rather than dropped immediately.
    pub fn release_id(&mut self, id: StableId) {
        if let Some(count) = self.interest.get_mut(&id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.pending_reclaim.push(id);
            }
        }
    }

    /// Drop every queued id whose interest is still zero and return how many
    /// were reclaimed.
    pub fn reclaim_pending(&mut self) -> usize {
        let mut reclaimed = 0;
        for id in std::mem::take(&mut self.pending_reclaim) {
            if self.interest.get(&id) != Some(&0) {
                continue;
            }
            self.interest.remove(&id);
            if let Some(path) = self.id_to_path.remove(&id) {
                if self.path_to_id.get(&path) == Some(&id) {
                    self.path_to_id.remove(&path);
                }
                tracing::trace!("reclaimed {} from {:?}", id, path);
            }
            self.free_ids.push(id);
            reclaimed += 1;
        }
        reclaimed
    }

    // -- Lookup -----------------------------------------------------------

    pub fn id_to_path(&self, id: StableId) -> Result<&str, TreeError> {
        self.id_to_path
            .get(&id)
            .map(String::as_str)
            .ok_or_else(|| TreeError::IdentityNotFound(id.to_string()))
    }

    /// Resolve `path` to its id. With `assert_existing` an untracked path
    /// fails; without it a zero-interest binding is created.
    pub fn path_to_id(&mut self, path: &str, assert_existing: bool) -> Result<StableId, TreeError> {
        if let Some(&id) = self.path_to_id.get(path) {
            return Ok(id);
        }
        if assert_existing {
            return Err(TreeError::IdentityNotFound(path.to_string()));
        }
        Ok(self.allocate(path, 0))
    }

    pub fn lookup(&self, path: &str) -> Option<StableId> {
        self.path_to_id.get(path).copied()
    }

    pub fn interest(&self, id: StableId) -> usize {
        self.interest.get(&id).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.path_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path_to_id.is_empty()
    }

    // -- Rename -----------------------------------------------------------

    /// Move the binding of `old_path`, and of every tracked path beneath it,
    /// under `new_path`. Must run before the matching filesystem rename
    /// becomes observable.
    pub fn before_rename(&mut self, old_path: &str, new_path: &str) {
        let moving: Vec<(String, StableId)> = self
            .path_to_id
            .iter()
            .filter(|(path, _)| path.as_str() == old_path || is_ancestor(path, old_path))
            .map(|(path, &id)| (path.clone(), id))
            .collect();

        for (path, _) in &moving {
            self.path_to_id.remove(path);
        }

        for (path, id) in moving {
            let moved = rebase(&path, old_path, new_path);
            if let Some(stale) = self.path_to_id.insert(moved.clone(), id) {
                // A deleted entry's id was still parked on the destination.
                self.id_to_path.remove(&stale);
                tracing::trace!("unbound stale {} from {:?}", stale, moved);
            }
            self.id_to_path.insert(id, moved);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- obtain / release --

    #[test]
    fn obtain_same_path_returns_same_id() {
        let mut reg = IdentityRegistry::new();
        let a = reg.obtain_id("a/x");
        let b = reg.obtain_id("a/x");
        assert_eq!(a, b);
        assert_eq!(reg.interest(a), 2);
    }

    #[test]
    fn release_defers_reclamation_until_sweep() {
        let mut reg = IdentityRegistry::new();
        let id = reg.obtain_id("a");
        reg.release_id(id);
        assert_eq!(reg.id_to_path(id).unwrap(), "a");
        assert_eq!(reg.reclaim_pending(), 1);
        assert!(matches!(reg.id_to_path(id), Err(TreeError::IdentityNotFound(_))));
        assert!(reg.lookup("a").is_none());
    }

    #[test]
    fn reacquire_before_sweep_keeps_id() {
        let mut reg = IdentityRegistry::new();
        let id = reg.obtain_id("a");
        reg.release_id(id);
        let again = reg.obtain_id("a");
        assert_eq!(again, id);
        assert_eq!(reg.reclaim_pending(), 0);
        assert_eq!(reg.id_to_path(id).unwrap(), "a");
    }

    #[test]
    fn reclaimed_ids_are_reused() {
        let mut reg = IdentityRegistry::new();
        let id = reg.obtain_id("a");
        reg.release_id(id);
        reg.reclaim_pending();
        let next = reg.obtain_id("b");
        assert_eq!(next, id);
        assert_eq!(reg.id_to_path(next).unwrap(), "b");
    }

    // -- freeze --

    #[test]
    fn freeze_keeps_id_alive_past_row_release() {
        let mut reg = IdentityRegistry::new();
        let id = reg.obtain_id("a");
        reg.freeze_id(id).unwrap();
        reg.release_id(id);
        assert_eq!(reg.reclaim_pending(), 0);
        assert_eq!(reg.id_to_path(id).unwrap(), "a");
    }

    #[test]
    fn raw_value_round_trips_through_wire_form() {
        let mut reg = IdentityRegistry::new();
        let id = reg.obtain_id("a");
        assert_eq!(StableId::from_raw(id.as_raw()), id);
        assert_eq!(serde_json::to_value(id).unwrap(), serde_json::json!(id.as_raw()));
    }

    #[test]
    fn freeze_unknown_id_fails() {
        let mut reg = IdentityRegistry::new();
        let err = reg.freeze_id(StableId::from_raw(42)).unwrap_err();
        assert!(matches!(err, TreeError::IdentityNotFound(_)));
    }

    // -- path_to_id --

    #[test]
    fn path_to_id_asserting_fails_when_untracked() {
        let mut reg = IdentityRegistry::new();
        assert!(matches!(
            reg.path_to_id("nope", true),
            Err(TreeError::IdentityNotFound(_))
        ));
    }

    #[test]
    fn path_to_id_lenient_binds_with_zero_interest() {
        let mut reg = IdentityRegistry::new();
        let id = reg.path_to_id("t", false).unwrap();
        assert_eq!(reg.interest(id), 0);
        assert_eq!(reg.obtain_id("t"), id);
        assert_eq!(reg.reclaim_pending(), 0);
    }

    #[test]
    fn unclaimed_lenient_binding_is_swept() {
        let mut reg = IdentityRegistry::new();
        reg.path_to_id("t", false).unwrap();
        assert_eq!(reg.reclaim_pending(), 1);
        assert!(reg.is_empty());
    }

    // -- before_rename --

    #[test]
    fn rename_moves_descendant_bindings() {
        let mut reg = IdentityRegistry::new();
        let dir = reg.obtain_id("a");
        let child = reg.obtain_id("a/x");
        let sibling = reg.obtain_id("ab");
        reg.before_rename("a", "b");
        assert_eq!(reg.id_to_path(dir).unwrap(), "b");
        assert_eq!(reg.id_to_path(child).unwrap(), "b/x");
        assert_eq!(reg.id_to_path(sibling).unwrap(), "ab");
        assert_eq!(reg.lookup("b/x"), Some(child));
        assert!(reg.lookup("a/x").is_none());
    }

    #[test]
    fn rename_over_stale_binding_unbinds_it() {
        let mut reg = IdentityRegistry::new();
        let stale = reg.obtain_id("b");
        let moving = reg.obtain_id("a");
        reg.before_rename("a", "b");
        assert_eq!(reg.lookup("b"), Some(moving));
        assert!(reg.id_to_path(stale).is_err());
        reg.release_id(stale);
        assert_eq!(reg.reclaim_pending(), 1);
        assert_eq!(reg.id_to_path(moving).unwrap(), "b");
    }
}
