//! Reference-strategy base themes: registry resolution at load time,
//! checksum drift as a non-fatal warning, and missing templates as errors.

use super::test_utils::{design_from_template, engine_with, path, registry_with};
use serde_json::json;
use std::sync::Arc;
use swatch::compose::CompositionEngine;
use swatch::design::Design;
use swatch::dsl::JsonDslCompiler;
use swatch::error::EngineError;
use swatch::persist::{LoadOptions, LoadWarning, SaveOptions};
use swatch::store::MemorySnapshotStore;
use swatch::tree;

fn brand_v1() -> serde_json::Value {
    json!({"palette": {"primary": {"main": "#101010"}}, "shape": {"radius": 4}})
}

fn brand_v2() -> serde_json::Value {
    json!({"palette": {"primary": {"main": "#202020"}}, "shape": {"radius": 4}})
}

#[test]
fn test_checksum_mismatch_warns_and_uses_live_template() {
    let store = Arc::new(MemorySnapshotStore::new());

    // Save against version 1 of the template.
    let registry_v1 = Arc::new(registry_with("brand", brand_v1()));
    let mut engine = engine_with(store.clone(), registry_v1.clone());
    let mut design = design_from_template(registry_v1.as_ref(), "brand");
    design.set_title("Branded");
    let id = engine.save(&mut design, SaveOptions::default()).unwrap();

    // The template evolves; a new session loads the snapshot.
    let registry_v2 = Arc::new(registry_with("brand", brand_v2()));
    let mut engine = engine_with(store, registry_v2);
    let mut reloaded = Design::load_new(&JsonDslCompiler, None, None).unwrap();
    let warnings = engine
        .load(&mut reloaded, &id, LoadOptions::default())
        .unwrap();

    assert_eq!(warnings.len(), 1);
    match &warnings[0] {
        LoadWarning::TemplateEvolved {
            template_id,
            stored,
            live,
        } => {
            assert_eq!(template_id, "brand");
            assert_ne!(stored, live);
        }
    }

    // The composed theme reflects the CURRENT template content.
    let composer = CompositionEngine::new(Arc::new(JsonDslCompiler));
    let composed = composer.compose(&reloaded, "light");
    assert_eq!(
        tree::get(&composed, &path("palette.primary.main")),
        Some(&json!("#202020"))
    );
    assert!(!reloaded.is_dirty());
}

#[test]
fn test_matching_checksum_loads_without_warnings() {
    let store = Arc::new(MemorySnapshotStore::new());
    let registry = Arc::new(registry_with("brand", brand_v1()));

    let mut engine = engine_with(store.clone(), registry.clone());
    let mut design = design_from_template(registry.as_ref(), "brand");
    design.set_title("Branded");
    let id = engine.save(&mut design, SaveOptions::default()).unwrap();

    let mut reloaded = Design::load_new(&JsonDslCompiler, None, None).unwrap();
    let warnings = engine
        .load(&mut reloaded, &id, LoadOptions::default())
        .unwrap();
    assert!(warnings.is_empty());
}

#[test]
fn test_missing_template_is_fatal_for_the_load() {
    let store = Arc::new(MemorySnapshotStore::new());
    let registry = Arc::new(registry_with("brand", brand_v1()));

    let mut engine = engine_with(store.clone(), registry.clone());
    let mut design = design_from_template(registry.as_ref(), "brand");
    design.set_title("Branded");
    let id = engine.save(&mut design, SaveOptions::default()).unwrap();

    // A registry without "brand" cannot resolve the reference.
    let bare_registry = Arc::new(registry_with("other", json!({})));
    let mut engine = engine_with(store, bare_registry);
    let mut reloaded = Design::load_new(&JsonDslCompiler, None, None).unwrap();
    let result = engine.load(&mut reloaded, &id, LoadOptions::default());
    assert!(matches!(result, Err(EngineError::TemplateMissing(_))));
}

#[test]
fn test_edits_survive_on_top_of_evolved_template() {
    let store = Arc::new(MemorySnapshotStore::new());
    let registry_v1 = Arc::new(registry_with("brand", brand_v1()));

    let mut engine = engine_with(store.clone(), registry_v1.clone());
    let mut design = design_from_template(registry_v1.as_ref(), "brand");
    design.set_title("Branded");
    design.add_edit(path("shape.radius"), json!(12), swatch::types::Scope::Global);
    let id = engine.save(&mut design, SaveOptions::default()).unwrap();

    let registry_v2 = Arc::new(registry_with("brand", brand_v2()));
    let mut engine = engine_with(store, registry_v2);
    let mut reloaded = Design::load_new(&JsonDslCompiler, None, None).unwrap();
    engine
        .load(&mut reloaded, &id, LoadOptions::default())
        .unwrap();

    let composer = CompositionEngine::new(Arc::new(JsonDslCompiler));
    let composed = composer.compose(&reloaded, "light");
    // Edit wins over the evolved template value at its path...
    assert_eq!(tree::get(&composed, &path("shape.radius")), Some(&json!(12)));
    // ...while untouched paths come from the live template.
    assert_eq!(
        tree::get(&composed, &path("palette.primary.main")),
        Some(&json!("#202020"))
    );
}
