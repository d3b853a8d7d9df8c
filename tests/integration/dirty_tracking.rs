//! Dirty invariant: clean after load_new, dirty after an edit, clean after a
//! successful save or load.

use super::test_utils::{memory_engine, new_design, path};
use serde_json::json;
use swatch::persist::{LoadOptions, SaveOptions};
use swatch::types::Scope;

#[test]
fn test_fresh_design_is_not_dirty() {
    let design = new_design();
    assert!(!design.is_dirty());
}

#[test]
fn test_edit_save_edit_cycle() {
    let mut engine = memory_engine();
    let mut design = new_design();
    design.set_title("Ocean");
    assert!(!design.is_dirty(), "title is not part of the fingerprint");

    design.add_edit(path("shape.radius"), json!(3), Scope::Global);
    assert!(design.is_dirty());

    engine.save(&mut design, SaveOptions::default()).unwrap();
    assert!(!design.is_dirty());

    design.add_edit(path("shape.radius"), json!(4), Scope::Global);
    assert!(design.is_dirty());

    // Returning to the checkpointed value by undo also returns to clean.
    design.undo_visual();
    assert!(!design.is_dirty());
}

#[test]
fn test_load_lands_clean() {
    let mut engine = memory_engine();
    let mut design = new_design();
    design.set_title("Ocean");
    design.add_edit(path("a.b"), json!(1), Scope::Global);
    let id = engine.save(&mut design, SaveOptions::default()).unwrap();

    let mut reloaded = new_design();
    engine
        .load(&mut reloaded, &id, LoadOptions::default())
        .unwrap();
    assert!(!reloaded.is_dirty());
    assert_eq!(reloaded.title(), "Ocean");
    assert_eq!(reloaded.neutral_edits().get(&path("a.b")), Some(&json!(1)));
}

#[test]
fn test_noop_edit_does_not_dirty_or_record() {
    let mut engine = memory_engine();
    let mut design = new_design();
    design.set_title("Ocean");
    design.add_edit(path("a"), json!(1), Scope::Global);
    engine.save(&mut design, SaveOptions::default()).unwrap();

    assert!(!design.add_edit(path("a"), json!(1), Scope::Global));
    assert!(!design.is_dirty());
    assert!(!design.remove_edit(&path("absent"), Scope::Global));
    assert!(!design.is_dirty());
}

#[test]
fn test_scheme_switch_does_not_dirty() {
    let design_scheme = {
        let mut design = new_design();
        design.set_active_scheme("dark");
        assert!(!design.is_dirty());
        design.active_scheme().to_string()
    };
    assert_eq!(design_scheme, "dark");
}
