//! Property-based tests for merge and fingerprint determinism guarantees

use proptest::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;
use swatch::tree::hasher::{fingerprint_design, fingerprint_value};
use swatch::tree::{deep_merge, ThemePath};

/// Arbitrary JSON leaf values.
fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| serde_json::json!(n)),
        "[a-z0-9#]{0,8}".prop_map(Value::String),
    ]
}

/// Arbitrary object-rooted theme trees, a few levels deep.
fn arb_tree() -> impl Strategy<Value = Value> {
    let node = arb_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    });
    prop::collection::btree_map("[a-z]{1,4}", node, 0..4)
        .prop_map(|map| Value::Object(map.into_iter().collect()))
}

/// Leaf paths of a tree with their values.
fn leaves(tree: &Value) -> Vec<(Vec<String>, Value)> {
    fn walk(value: &Value, prefix: &mut Vec<String>, out: &mut Vec<(Vec<String>, Value)>) {
        match value.as_object() {
            Some(map) if !map.is_empty() => {
                for (key, child) in map {
                    prefix.push(key.clone());
                    walk(child, prefix, out);
                    prefix.pop();
                }
            }
            _ => out.push((prefix.clone(), value.clone())),
        }
    }
    let mut out = Vec::new();
    walk(tree, &mut Vec::new(), &mut out);
    out
}

proptest! {
    /// deep_merge(x, {}) == x
    #[test]
    fn merge_with_empty_is_identity(tree in arb_tree()) {
        let empty = Value::Object(serde_json::Map::new());
        prop_assert_eq!(deep_merge(&tree, &empty), tree);
    }

    /// deep_merge(x, x) == x
    #[test]
    fn merge_with_self_is_identity(tree in arb_tree()) {
        prop_assert_eq!(deep_merge(&tree, &tree), tree.clone());
    }

    /// Every leaf present in the overlay wins in the merged result.
    #[test]
    fn overlay_leaves_always_win(base in arb_tree(), overlay in arb_tree()) {
        let merged = deep_merge(&base, &overlay);
        for (segments, value) in leaves(&overlay) {
            // The root and empty objects are not leaves that "win": an empty
            // object merges recursively and contributes nothing.
            if segments.is_empty() || value.as_object().is_some_and(|m| m.is_empty()) {
                continue;
            }
            let path = ThemePath::new(segments.clone()).unwrap();
            let merged_value = swatch::tree::get(&merged, &path);
            prop_assert_eq!(
                merged_value,
                Some(&value),
                "overlay leaf lost at {:?}",
                segments
            );
        }
    }

    /// Merging never mutates its inputs.
    #[test]
    fn merge_is_pure(base in arb_tree(), overlay in arb_tree()) {
        let base_before = base.clone();
        let overlay_before = overlay.clone();
        let _ = deep_merge(&base, &overlay);
        prop_assert_eq!(base, base_before);
        prop_assert_eq!(overlay, overlay_before);
    }

    /// Value fingerprints are a pure function of content.
    #[test]
    fn value_fingerprint_deterministic(tree in arb_tree()) {
        prop_assert_eq!(fingerprint_value(&tree), fingerprint_value(&tree.clone()));
    }

    /// Design fingerprints are deterministic and sensitive to the base text.
    #[test]
    fn design_fingerprint_deterministic(
        base in "[a-z{}: ]{0,32}",
        key in "[a-z]{1,6}",
        value in arb_leaf(),
    ) {
        let mut edits = BTreeMap::new();
        edits.insert(ThemePath::parse(&key).unwrap(), value);
        let schemes = BTreeMap::new();
        let code = BTreeMap::new();

        let a = fingerprint_design(&base, &edits, &schemes, &code);
        let b = fingerprint_design(&base, &edits, &schemes, &code);
        prop_assert_eq!(a.clone(), b);

        let other = fingerprint_design(&format!("{}!", base), &edits, &schemes, &code);
        prop_assert_ne!(a, other);
    }
}
