//! Deep merge of theme-option trees.

use serde_json::Value;

/// Merge `overlay` over `base`, returning a new tree. Neither input is
/// mutated.
///
/// Objects merge recursively; every other value kind (primitives and arrays)
/// replaces wholesale, so the overlay always wins at a leaf. Arrays are never
/// concatenated.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                match merged.get(key) {
                    Some(base_value) => {
                        let value = deep_merge(base_value, overlay_value);
                        merged.insert(key.clone(), value);
                    }
                    None => {
                        merged.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
            Value::Object(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}
