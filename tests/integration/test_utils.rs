//! Shared test utilities for integration tests

use std::sync::Arc;
use swatch::design::{BaseThemeMetadata, Design};
use swatch::dsl::JsonDslCompiler;
use swatch::persist::PersistenceEngine;
use swatch::store::MemorySnapshotStore;
use swatch::template::{InMemoryTemplateRegistry, TemplateRecord, TemplateRegistry};
use swatch::tree::ThemePath;

/// Fresh design on the built-in default template.
pub fn new_design() -> Design {
    Design::load_new(&JsonDslCompiler, None, None).expect("default design loads")
}

/// Persistence engine over a fresh in-memory store and the default registry.
pub fn memory_engine() -> PersistenceEngine {
    PersistenceEngine::builder()
        .store(Arc::new(MemorySnapshotStore::new()))
        .templates(Arc::new(InMemoryTemplateRegistry::new()))
        .build()
        .expect("engine builds")
}

/// Engine sharing an existing store, with an explicit registry.
pub fn engine_with(
    store: Arc<MemorySnapshotStore>,
    registry: Arc<dyn TemplateRegistry>,
) -> PersistenceEngine {
    PersistenceEngine::builder()
        .store(store)
        .templates(registry)
        .build()
        .expect("engine builds")
}

/// Design created from a named registry template, carrying its template id.
pub fn design_from_template(registry: &dyn TemplateRegistry, template_id: &str) -> Design {
    let record = registry.get(template_id).expect("template exists");
    let source = serde_json::to_string_pretty(&record.theme_options).unwrap();
    Design::load_new(
        &JsonDslCompiler,
        Some(&source),
        Some(BaseThemeMetadata::new(Some(template_id.to_string()))),
    )
    .expect("template design loads")
}

/// Registry seeded with one custom template.
pub fn registry_with(template_id: &str, theme_options: serde_json::Value) -> InMemoryTemplateRegistry {
    let mut registry = InMemoryTemplateRegistry::new();
    registry.insert(
        template_id,
        TemplateRecord {
            theme_options,
            version: "1".to_string(),
            label: template_id.to_string(),
        },
    );
    registry
}

pub fn path(text: &str) -> ThemePath {
    ThemePath::parse(text).expect("valid path")
}
