//! Title-conflict detection and resolution, including the concrete
//! two-Oceans scenario.

use super::test_utils::{memory_engine, new_design, path};
use serde_json::json;
use swatch::error::EngineError;
use swatch::persist::{ConflictPolicy, ConflictState, SaveOptions};
use swatch::types::Scope;

fn save_options(on_conflict: ConflictPolicy) -> SaveOptions {
    SaveOptions {
        target_id: None,
        title: None,
        on_conflict,
    }
}

#[test]
fn test_fail_then_overwrite_updates_in_place() {
    let mut engine = memory_engine();

    // First design titled "Ocean" saves as snapshot A.
    let mut first = new_design();
    first.set_title("Ocean");
    first.add_edit(path("shape.radius"), json!(1), Scope::Global);
    let snapshot_a = engine.save(&mut first, SaveOptions::default()).unwrap();

    // The user starts a new, unsaved design also titled "Ocean".
    engine.detach_current();
    let mut second = new_design();
    second.set_title("Ocean");
    second.add_edit(path("shape.radius"), json!(2), Scope::Global);

    // Fail policy rejects, referencing snapshot A.
    match engine.save(&mut second, save_options(ConflictPolicy::Fail)) {
        Err(EngineError::Conflict { id, title }) => {
            assert_eq!(id, snapshot_a);
            assert_eq!(title, "Ocean");
        }
        other => panic!("expected conflict, got {:?}", other.map(|_| ())),
    }
    assert!(second.is_dirty(), "failed save must not checkpoint");

    // Overwrite policy redirects to snapshot A rather than creating B.
    let overwritten = engine
        .save(&mut second, save_options(ConflictPolicy::Overwrite))
        .unwrap();
    assert_eq!(overwritten, snapshot_a);
    assert_eq!(engine.collection().len(), 1);
    assert!(!second.is_dirty());

    // And the stored content is the second design's.
    let mut reloaded = new_design();
    engine
        .load(&mut reloaded, &snapshot_a, Default::default())
        .unwrap();
    assert_eq!(
        reloaded.neutral_edits().get(&path("shape.radius")),
        Some(&json!(2))
    );
}

#[test]
fn test_resave_own_snapshot_is_not_a_conflict() {
    let mut engine = memory_engine();
    let mut design = new_design();
    design.set_title("Ocean");
    let id = engine.save(&mut design, SaveOptions::default()).unwrap();

    design.add_edit(path("a"), json!(1), Scope::Global);
    let again = engine.save(&mut design, SaveOptions::default()).unwrap();
    assert_eq!(id, again);
}

#[test]
fn test_conflict_lookup_is_title_normalized() {
    let mut engine = memory_engine();
    let mut first = new_design();
    first.set_title("Ocean");
    engine.save(&mut first, SaveOptions::default()).unwrap();

    engine.detach_current();
    let mut second = new_design();
    second.set_title("  OCEAN ");
    assert!(matches!(
        engine.save(&mut second, save_options(ConflictPolicy::Fail)),
        Err(EngineError::Conflict { .. })
    ));
}

#[test]
fn test_prompt_opens_flow_and_overwrite_resolves() {
    let mut engine = memory_engine();
    let mut first = new_design();
    first.set_title("Ocean");
    let snapshot_a = engine.save(&mut first, SaveOptions::default()).unwrap();

    engine.detach_current();
    let mut second = new_design();
    second.set_title("Ocean");
    second.add_edit(path("a"), json!(9), Scope::Global);

    let result = engine.save(&mut second, save_options(ConflictPolicy::Prompt));
    assert!(matches!(result, Err(EngineError::Conflict { .. })));
    assert!(matches!(
        engine.conflict_state(),
        ConflictState::Choose { .. }
    ));

    let resolved = engine.resolve_conflict_overwrite(&mut second).unwrap();
    assert_eq!(resolved, Some(snapshot_a));
    assert!(matches!(engine.conflict_state(), ConflictState::Closed));
    assert!(!second.is_dirty());
}

#[test]
fn test_prompt_rename_collision_reenters_rename() {
    let mut engine = memory_engine();

    let mut ocean = new_design();
    ocean.set_title("Ocean");
    engine.save(&mut ocean, SaveOptions::default()).unwrap();

    engine.detach_current();
    let mut forest = new_design();
    forest.set_title("Forest");
    engine.save(&mut forest, SaveOptions::default()).unwrap();

    // Third design collides with "Ocean"; prompt opens the flow.
    engine.detach_current();
    let mut third = new_design();
    third.set_title("Ocean");
    let _ = engine.save(&mut third, save_options(ConflictPolicy::Prompt));

    // Renaming to "Forest" collides again: the flow re-enters Rename with
    // an error message instead of failing silently.
    let outcome = engine.resolve_conflict_rename(&mut third, "Forest").unwrap();
    assert_eq!(outcome, None);
    match engine.conflict_state() {
        ConflictState::Rename { error, .. } => {
            assert!(error.as_deref().unwrap().contains("Forest"));
        }
        other => panic!("expected rename state, got {:?}", other),
    }

    // A unique title completes the save-as-new.
    let saved = engine.resolve_conflict_rename(&mut third, "Meadow").unwrap();
    assert!(saved.is_some());
    assert_eq!(third.title(), "Meadow");
    assert_eq!(engine.collection().len(), 3);
    assert!(!third.is_dirty());
}

#[test]
fn test_cancel_leaves_nothing_saved() {
    let mut engine = memory_engine();
    let mut ocean = new_design();
    ocean.set_title("Ocean");
    engine.save(&mut ocean, SaveOptions::default()).unwrap();

    engine.detach_current();
    let mut dup = new_design();
    dup.set_title("Ocean");
    let _ = engine.save(&mut dup, save_options(ConflictPolicy::Prompt));

    engine.cancel_conflict();
    assert!(matches!(engine.conflict_state(), ConflictState::Closed));
    assert_eq!(engine.collection().len(), 1);
}

#[test]
fn test_rename_persisted_design_through_conflict_path() {
    let mut engine = memory_engine();

    let mut ocean = new_design();
    ocean.set_title("Ocean");
    engine.save(&mut ocean, SaveOptions::default()).unwrap();

    engine.detach_current();
    let mut forest = new_design();
    forest.set_title("Forest");
    engine.save(&mut forest, SaveOptions::default()).unwrap();

    // Renaming the persisted "Forest" design to "Ocean" collides.
    assert!(matches!(
        engine.rename(&mut forest, "Ocean", ConflictPolicy::Fail),
        Err(EngineError::Conflict { .. })
    ));
    // The stored snapshot keeps its old title after the failed rename.
    let titles: Vec<String> = engine
        .collection()
        .iter()
        .map(|s| s.title.clone())
        .collect();
    assert!(titles.contains(&"Forest".to_string()));
}
