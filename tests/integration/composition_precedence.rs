//! Composition precedence across every present/absent layer permutation.
//!
//! For a path present in several layers, the composed value must come from
//! the highest-precedence layer that carries it:
//! code override > scheme edit > neutral edit > base template.

use super::test_utils::{new_design, path};
use std::sync::Arc;
use swatch::compose::CompositionEngine;
use swatch::dsl::JsonDslCompiler;
use swatch::tree;
use swatch::types::Scope;
use serde_json::{json, Value};

const TARGET: &str = "palette.primary.main";

fn composed_value(
    neutral: bool,
    scheme: bool,
    code: bool,
) -> Value {
    let compiler = JsonDslCompiler;
    let mut design = new_design();
    design.set_active_scheme("light");

    if neutral {
        design.add_edit(path(TARGET), json!("#00000e"), Scope::Global);
    }
    if scheme {
        design.add_edit(path(TARGET), json!("#00000d"), Scope::Scheme("light".to_string()));
    }
    if code {
        design.commit_code_overrides(
            &compiler,
            r##"{"palette": {"primary": {"main": "#00000c"}}}"##,
        );
    }

    let composer = CompositionEngine::new(Arc::new(JsonDslCompiler));
    let composed = composer.compose(&design, "light");
    tree::get(&composed, &path(TARGET))
        .cloned()
        .expect("target path always present via the base template")
}

#[test]
fn test_all_layer_permutations() {
    // The base template always carries the target path, so the expected
    // winner is the highest-precedence layer present.
    let base_value = {
        let design = new_design();
        tree::get(
            &design.template_for("light"),
            &path(TARGET),
        )
        .cloned()
        .unwrap()
    };

    for mask in 0..8u8 {
        let neutral = mask & 1 != 0;
        let scheme = mask & 2 != 0;
        let code = mask & 4 != 0;

        let expected = if code {
            json!("#00000c")
        } else if scheme {
            json!("#00000d")
        } else if neutral {
            json!("#00000e")
        } else {
            base_value.clone()
        };

        assert_eq!(
            composed_value(neutral, scheme, code),
            expected,
            "wrong winner for neutral={} scheme={} code={}",
            neutral,
            scheme,
            code
        );
    }
}

#[test]
fn test_scheme_edit_only_applies_to_its_scheme() {
    let mut design = new_design();
    design.add_edit(path(TARGET), json!("#aaaaaa"), Scope::Scheme("dark".to_string()));

    let composer = CompositionEngine::new(Arc::new(JsonDslCompiler));
    let light = composer.compose(&design, "light");
    let dark = composer.compose(&design, "dark");

    assert_ne!(
        tree::get(&light, &path(TARGET)),
        Some(&json!("#aaaaaa"))
    );
    assert_eq!(tree::get(&dark, &path(TARGET)), Some(&json!("#aaaaaa")));
}

#[test]
fn test_neutral_edit_applies_to_every_scheme() {
    let mut design = new_design();
    design.add_edit(path("shape.radius"), json!(42), Scope::Global);

    let composer = CompositionEngine::new(Arc::new(JsonDslCompiler));
    for scheme in ["light", "dark"] {
        let composed = composer.compose(&design, scheme);
        assert_eq!(tree::get(&composed, &path("shape.radius")), Some(&json!(42)));
    }
}
