// ---------------------------------------------------------------------------
// Integration tests for arbor-tree
//
// Each test builds a small store, drives a controller through its public
// API, and checks both the store and the derived tree state.
// ---------------------------------------------------------------------------

use std::cell::RefCell;
use std::rc::Rc;

use arbor_tree::{StableId, TreeConfig, TreeController, TreeError};
use arbor_vfs::{RenamePolicy, SharedFs, VfsError, VfsOptions, VirtualFs};

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

/// Store layout used throughout:
///
/// ```text
/// a/
///   x
///   y/
///     z
/// t/
/// notes
/// ```
fn store() -> SharedFs<String> {
    let mut fs = VirtualFs::new();
    fs.mkdir("a/y", true).unwrap();
    fs.write_file("a/x", "x".to_string()).unwrap();
    fs.write_file("a/y/z", "z".to_string()).unwrap();
    fs.mkdir("t", false).unwrap();
    fs.write_file("notes", "n".to_string()).unwrap();
    fs.into_shared()
}

fn id_of(c: &mut TreeController<String>, path: &str) -> StableId {
    c.flat_rows()
        .iter()
        .find(|row| row.path == path)
        .map(|row| row.id)
        .unwrap_or_else(|| panic!("{} is not visible", path))
}

fn visible(c: &mut TreeController<String>) -> Vec<String> {
    c.flat_rows().iter().map(|row| row.path.clone()).collect()
}

// ---------------------------------------------------------------------------
// Test 1: rename relocates a whole subtree and keeps identities
// ---------------------------------------------------------------------------

#[test]
fn rename_relocates_subtree_and_keeps_identity() {
    let fs = store();
    let mut c = TreeController::new(Rc::clone(&fs), TreeConfig::new());
    let a = id_of(&mut c, "a");
    c.expand(a).unwrap();
    let x = id_of(&mut c, "a/x");

    c.rename_dir_ent("a", "b").unwrap();

    assert!(c.exists("b/x"));
    assert!(c.exists("b/y/z"));
    assert!(!c.exists("a/x"));
    assert_eq!(c.id_to_path(x).unwrap(), "b/x");
    assert_eq!(visible(&mut c), vec!["", "b", "b/y", "b/x", "t", "notes"]);
}

// ---------------------------------------------------------------------------
// Test 2: nested selection moves with its ancestor
// ---------------------------------------------------------------------------

#[test]
fn move_nested_selection_rides_with_ancestor() {
    let mut c = TreeController::new(store(), TreeConfig::new());
    let a = id_of(&mut c, "a");
    c.expand(a).unwrap();
    let x = id_of(&mut c, "a/x");
    c.select(a).unwrap();
    c.select(x).unwrap();

    c.move_selected_dir_ents_to_path("t").unwrap();

    assert!(c.exists("t/a"));
    assert!(c.exists("t/a/x"));
    assert!(c.exists("t/a/y/z"));
    assert!(!c.exists("t/x"));
    assert!(!c.exists("a"));

    let t = c.path_to_id("t", true).unwrap();
    assert!(c.is_expanded(t));
    assert!(c.is_expanded(a));
    assert_eq!(c.selected_paths(), vec!["t/a", "t/a/x"]);
    assert_eq!(c.focused_id(), Some(a));
}

// ---------------------------------------------------------------------------
// Test 3: moving into a descendant is rejected without side effects
// ---------------------------------------------------------------------------

#[test]
fn move_into_descendant_is_invalid() {
    let fs = store();
    let mut c = TreeController::new(Rc::clone(&fs), TreeConfig::new());
    let a = id_of(&mut c, "a");
    c.select(a).unwrap();
    let before = fs.borrow().snapshot();

    let err = c.move_selected_dir_ents_to_path("a/y").unwrap_err();
    assert!(matches!(err, TreeError::InvalidMove { .. }));
    assert_eq!(err.code(), "TREE_INVALID_MOVE");
    assert_eq!(fs.borrow().snapshot(), before);

    let err = c.move_selected_dir_ents_to_path("/a").unwrap_err();
    assert!(matches!(err, TreeError::InvalidMove { .. }));
}

// ---------------------------------------------------------------------------
// Test 4: any colliding destination aborts the whole move
// ---------------------------------------------------------------------------

#[test]
fn move_collision_leaves_store_unchanged() {
    let fs = store();
    fs.borrow_mut().mkdir("t/a", false).unwrap();
    let mut c = TreeController::new(Rc::clone(&fs), TreeConfig::new());
    let a = id_of(&mut c, "a");
    let notes = id_of(&mut c, "notes");
    c.select(notes).unwrap();
    c.select(a).unwrap();
    let before = fs.borrow().snapshot();

    let err = c.move_selected_dir_ents_to_path("t").unwrap_err();
    assert_eq!(err, TreeError::PathsAlreadyExist(vec!["t/a".to_string()]));
    assert_eq!(fs.borrow().snapshot(), before);
    assert!(c.exists("notes"));
    assert_eq!(c.focused_id(), None);
}

#[test]
fn move_with_empty_selection_is_noop() {
    let fs = store();
    let mut c = TreeController::new(Rc::clone(&fs), TreeConfig::new());
    let version = fs.borrow().version();
    c.move_selected_dir_ents_to_path("t").unwrap();
    assert_eq!(fs.borrow().version(), version);
}

// ---------------------------------------------------------------------------
// Test 5: selection range follows the flat order
// ---------------------------------------------------------------------------

#[test]
fn shift_select_replaces_most_recent_span_end() {
    let mut c = TreeController::new(store(), TreeConfig::new());
    let a = id_of(&mut c, "a");
    c.expand(a).unwrap();
    // "", a, a/y, a/x, t, notes
    let y = id_of(&mut c, "a/y");
    let t = id_of(&mut c, "t");

    c.select(a).unwrap();
    c.shift_select(y).unwrap();
    assert_eq!(c.selected_paths(), vec!["a", "a/y"]);

    c.shift_select(t).unwrap();
    assert_eq!(c.selected_paths(), vec!["a", "a/y", "a/x", "t"]);
}

// ---------------------------------------------------------------------------
// Test 6: callbacks fire once per batch
// ---------------------------------------------------------------------------

#[test]
fn callbacks_fire_once_per_batch() {
    let selections: Rc<RefCell<Vec<Vec<String>>>> = Rc::new(RefCell::new(Vec::new()));
    let renames: Rc<RefCell<Vec<(String, String)>>> = Rc::new(RefCell::new(Vec::new()));
    let selection_sink = Rc::clone(&selections);
    let rename_sink = Rc::clone(&renames);

    let config = TreeConfig::new()
        .on_selection(move |paths| selection_sink.borrow_mut().push(paths.to_vec()))
        .on_rename(move |from, to| {
            rename_sink
                .borrow_mut()
                .push((from.to_string(), to.to_string()))
        });
    let mut c = TreeController::new(store(), config);
    let a = id_of(&mut c, "a");
    let notes = id_of(&mut c, "notes");

    c.batch(|c| {
        c.select(a).unwrap();
        c.select(notes).unwrap();
    });
    assert_eq!(selections.borrow().len(), 1);

    c.move_selected_dir_ents_to_path("t").unwrap();

    assert_eq!(
        *selections.borrow(),
        vec![
            vec!["a".to_string(), "notes".to_string()],
            vec!["t/a".to_string(), "t/notes".to_string()],
        ]
    );
    assert_eq!(
        *renames.borrow(),
        vec![
            ("a".to_string(), "t/a".to_string()),
            ("notes".to_string(), "t/notes".to_string()),
        ]
    );
}

// ---------------------------------------------------------------------------
// Test 7: two controllers share a store but not identities
// ---------------------------------------------------------------------------

#[test]
fn controllers_over_one_store_are_independent() {
    let fs = store();
    let mut left = TreeController::new(Rc::clone(&fs), TreeConfig::new());
    let mut right = TreeController::new(Rc::clone(&fs), TreeConfig::new().with_base("a"));

    let a = id_of(&mut left, "a");
    left.expand(a).unwrap();
    left.select(a).unwrap();

    assert_eq!(visible(&mut right), vec!["a", "a/y", "a/x"]);
    assert!(right.selected_paths().is_empty());

    left.rename_dir_ent("a/x", "a/w").unwrap();
    right.refresh();
    assert_eq!(visible(&mut right), vec!["a", "a/y", "a/w"]);
    assert!(right.registry().lookup("a/w").is_some());
    assert!(right.registry().lookup("a/x").is_none());
}

// ---------------------------------------------------------------------------
// Test 8: rename policy
// ---------------------------------------------------------------------------

#[test]
fn lenient_rename_of_missing_source_is_noop() {
    let fs = store();
    let mut c = TreeController::new(Rc::clone(&fs), TreeConfig::new());
    let before = fs.borrow().snapshot();
    c.rename_dir_ent("missing", "elsewhere").unwrap();
    assert_eq!(fs.borrow().snapshot(), before);
    assert_eq!(c.focused_id(), None);
}

#[test]
fn strict_rename_of_missing_source_fails() {
    let fs = VirtualFs::<String>::with_options(VfsOptions {
        rename_policy: RenamePolicy::Strict,
        ..VfsOptions::default()
    })
    .into_shared();
    let mut c = TreeController::new(fs, TreeConfig::new());
    let err = c.rename_dir_ent("missing", "elsewhere").unwrap_err();
    assert!(matches!(err, TreeError::Vfs(VfsError::PathNotFound(_))));
}

// ---------------------------------------------------------------------------
// Test 9: deleted entries keep their id while still referenced
// ---------------------------------------------------------------------------

#[test]
fn deleted_selected_entry_keeps_id_until_released() {
    let fs = store();
    let mut c = TreeController::new(Rc::clone(&fs), TreeConfig::new());
    let notes = id_of(&mut c, "notes");
    c.select(notes).unwrap();

    fs.borrow_mut().rm("notes", false, false).unwrap();
    c.refresh();

    assert_eq!(visible(&mut c), vec!["", "a", "t"]);
    assert_eq!(c.id_to_path(notes).unwrap(), "notes");
    assert_eq!(c.selected_paths(), vec!["notes"]);

    c.deselect(notes);
    assert!(c.id_to_path(notes).is_err());
}

// ---------------------------------------------------------------------------
// Test 10: flat entries expose presentation fields
// ---------------------------------------------------------------------------

#[test]
fn flat_entries_project_presentation_fields() {
    let mut c = TreeController::new(store(), TreeConfig::new());
    let a = id_of(&mut c, "a");
    c.expand(a).unwrap();
    let x = id_of(&mut c, "a/x");
    c.focus(x).unwrap();

    let entries = c.flat_entries();
    let dir = entries.iter().find(|e| e.path == "a").unwrap();
    assert_eq!(dir.expanded, Some(true));
    assert_eq!(dir.depth, 1);
    let file = entries.iter().find(|e| e.path == "a/x").unwrap();
    assert_eq!(file.name, "x");
    assert_eq!(file.depth, 2);
    assert!(file.focused);
    assert_eq!(file.expanded, None);

    let json = serde_json::to_value(file).unwrap();
    assert_eq!(json["path"], "a/x");
    assert!(json.get("expanded").is_none());
}
