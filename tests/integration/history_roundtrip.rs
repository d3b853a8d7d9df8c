//! Undo/redo round trips: N undos followed by N redos reproduce the exact
//! composed theme.

use super::test_utils::{new_design, path};
use serde_json::json;
use std::sync::Arc;
use swatch::compose::CompositionEngine;
use swatch::dsl::JsonDslCompiler;
use swatch::types::Scope;

#[test]
fn test_undo_redo_round_trip_reproduces_composed_theme() {
    let mut design = new_design();
    let composer = CompositionEngine::new(Arc::new(JsonDslCompiler));

    // A mixed sequence: adds, an overwrite, a removal, scheme-scoped edits.
    design.add_edit(path("palette.primary.main"), json!("#111111"), Scope::Global);
    design.add_edit(path("shape.radius"), json!(2), Scope::Global);
    design.add_edit(path("shape.radius"), json!(9), Scope::Global);
    design.add_edit(
        path("palette.background.default"),
        json!("#0a0a0a"),
        Scope::Scheme("dark".to_string()),
    );
    design.remove_edit(&path("palette.primary.main"), Scope::Global);
    let steps = 5;

    let edited_light = composer.compose(&design, "light").as_ref().clone();
    let edited_dark = composer.compose(&design, "dark").as_ref().clone();
    let edited_fingerprint = design.content_fingerprint().clone();

    for _ in 0..steps {
        assert!(design.undo_visual());
    }
    assert!(!design.can_undo_visual());

    // Fully undone state matches a never-edited design's composition.
    let pristine = new_design();
    assert_eq!(
        composer.compose(&design, "light").as_ref(),
        composer.compose(&pristine, "light").as_ref()
    );

    for _ in 0..steps {
        assert!(design.redo_visual());
    }
    assert!(!design.can_redo_visual());

    assert_eq!(design.content_fingerprint(), &edited_fingerprint);
    assert_eq!(composer.compose(&design, "light").as_ref(), &edited_light);
    assert_eq!(composer.compose(&design, "dark").as_ref(), &edited_dark);
}

#[test]
fn test_new_edit_invalidates_redo() {
    let mut design = new_design();
    design.add_edit(path("a"), json!(1), Scope::Global);
    design.add_edit(path("a"), json!(2), Scope::Global);
    design.undo_visual();
    assert!(design.can_redo_visual());

    design.add_edit(path("b"), json!(3), Scope::Global);
    assert!(!design.can_redo_visual());
    assert!(!design.redo_visual());
}

#[test]
fn test_code_and_visual_histories_are_independent() {
    let compiler = JsonDslCompiler;
    let mut design = new_design();

    design.add_edit(path("a"), json!(1), Scope::Global);
    design.commit_code_overrides(&compiler, r#"{"x": 1}"#);
    design.commit_code_overrides(&compiler, r#"{"x": 2}"#);

    // Undoing code twice leaves the visual edit in place.
    assert!(design.undo_code(&compiler));
    assert!(design.undo_code(&compiler));
    assert_eq!(design.code_overrides().source_text, "");
    assert_eq!(design.neutral_edits().get(&path("a")), Some(&json!(1)));
    assert!(design.can_undo_visual());

    // And undoing the visual edit leaves the code redo chain intact.
    assert!(design.undo_visual());
    assert!(design.can_redo_code());
    assert!(design.redo_code(&compiler));
    assert_eq!(design.code_overrides().source_text, r#"{"x": 1}"#);
}

#[test]
fn test_undo_batch_clear_restores_all_layers() {
    let mut design = new_design();
    design.add_edit(path("a"), json!(1), Scope::Global);
    design.add_edit(path("b"), json!(2), Scope::Scheme("dark".to_string()));
    let fingerprint = design.content_fingerprint().clone();

    design.clear_edits(swatch::design::ClearScope::All);
    assert!(design.neutral_edits().is_empty());

    assert!(design.undo_visual());
    assert_eq!(design.content_fingerprint(), &fingerprint);
    assert_eq!(design.neutral_edits().get(&path("a")), Some(&json!(1)));
    assert_eq!(
        design
            .scheme_edits_for("dark")
            .and_then(|edits| edits.get(&path("b"))),
        Some(&json!(2))
    );
}
