//! Template registry seam and the built-in starting template.
//!
//! Reference-strategy snapshots resolve their base theme against a registry
//! at load time; `load_new` without an explicit theme starts from the
//! built-in default template.

use crate::tree::hasher::{fingerprint_value, Fingerprint};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Template id of the built-in starting theme.
pub const DEFAULT_TEMPLATE_ID: &str = "swatch-default";

/// A named base-theme template.
#[derive(Debug, Clone)]
pub struct TemplateRecord {
    pub theme_options: Value,
    pub version: String,
    pub label: String,
}

/// Registry of named base-theme templates.
pub trait TemplateRegistry: Send + Sync {
    fn get(&self, template_id: &str) -> Option<TemplateRecord>;
    fn list(&self) -> Vec<String>;
}

/// In-memory registry, seeded with the built-in default template.
pub struct InMemoryTemplateRegistry {
    templates: HashMap<String, TemplateRecord>,
}

impl Default for InMemoryTemplateRegistry {
    fn default() -> Self {
        let mut registry = InMemoryTemplateRegistry {
            templates: HashMap::new(),
        };
        registry.insert(
            DEFAULT_TEMPLATE_ID,
            TemplateRecord {
                theme_options: default_template_options(),
                version: "1".to_string(),
                label: "Swatch Default".to_string(),
            },
        );
        registry
    }
}

impl InMemoryTemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template_id: &str, record: TemplateRecord) {
        self.templates.insert(template_id.to_string(), record);
    }
}

impl TemplateRegistry for InMemoryTemplateRegistry {
    fn get(&self, template_id: &str) -> Option<TemplateRecord> {
        self.templates.get(template_id).cloned()
    }

    fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.templates.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Checksum of a template's theme options, recorded in reference-strategy
/// snapshots and compared on load.
pub fn template_checksum(theme_options: &Value) -> Fingerprint {
    fingerprint_value(theme_options)
}

/// The built-in starting theme: a neutral palette with light/dark scheme
/// subtrees under the `schemes` key.
pub fn default_template_options() -> Value {
    json!({
        "palette": {
            "primary": { "main": "#1976d2", "contrast": "#ffffff" },
            "secondary": { "main": "#9c27b0", "contrast": "#ffffff" },
            "background": { "default": "#fafafa", "surface": "#ffffff" },
            "text": { "primary": "#1a1a1a", "secondary": "#555555" }
        },
        "typography": {
            "font_family": "Inter, sans-serif",
            "base_size": 16
        },
        "shape": { "radius": 6 },
        "schemes": {
            "light": {},
            "dark": {
                "palette": {
                    "background": { "default": "#121212", "surface": "#1e1e1e" },
                    "text": { "primary": "#f0f0f0", "secondary": "#b0b0b0" }
                }
            }
        }
    })
}
