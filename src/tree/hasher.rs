//! Content fingerprinting for editable theme state using BLAKE3
//!
//! Fingerprints drive dirty-checking and composition caching, so the hash
//! construction must be fully deterministic: domain discriminators, length
//! prefixes (8 bytes, big-endian), and sorted key order regardless of the
//! in-memory map layout.

use crate::tree::ThemePath;
use crate::types::SchemeId;
use blake3::Hasher;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Hex-encoded BLAKE3 digest of editable state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for logs.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fingerprint of the editable state tuple: base theme source text, neutral
/// edits, per-scheme edits, and flattened code overrides.
///
/// Title, active scheme, and raw override text are deliberately excluded;
/// they do not participate in dirty-checking.
pub fn fingerprint_design(
    base_source: &str,
    neutral_edits: &BTreeMap<ThemePath, Value>,
    scheme_edits: &BTreeMap<SchemeId, BTreeMap<ThemePath, Value>>,
    code_flattened: &BTreeMap<ThemePath, Value>,
) -> Fingerprint {
    let mut hasher = Hasher::new();

    hasher.update(b"base");
    update_lengthed(&mut hasher, base_source.as_bytes());

    hasher.update(b"neutral");
    hash_edit_map(&mut hasher, neutral_edits);

    hasher.update(b"scheme");
    hasher.update(&(scheme_edits.len() as u64).to_be_bytes());
    for (scheme, edits) in scheme_edits {
        update_lengthed(&mut hasher, scheme.as_bytes());
        hash_edit_map(&mut hasher, edits);
    }

    hasher.update(b"code");
    hash_edit_map(&mut hasher, code_flattened);

    Fingerprint(hex::encode(hasher.finalize().as_bytes()))
}

/// Fingerprint of an arbitrary theme-options tree with canonical key order.
///
/// Used for template checksums and composition cache keys.
pub fn fingerprint_value(value: &Value) -> Fingerprint {
    let mut hasher = Hasher::new();
    hash_value(&mut hasher, value);
    Fingerprint(hex::encode(hasher.finalize().as_bytes()))
}

/// Fingerprint of the full composition input for cache keying.
pub fn fingerprint_composition_input(
    base: &Value,
    neutral_edits: &BTreeMap<ThemePath, Value>,
    scheme_edits: Option<&BTreeMap<ThemePath, Value>>,
    code_parsed: &Value,
    scheme: &str,
) -> Fingerprint {
    let mut hasher = Hasher::new();

    hasher.update(b"template");
    hash_value(&mut hasher, base);

    hasher.update(b"neutral");
    hash_edit_map(&mut hasher, neutral_edits);

    hasher.update(b"scheme-edits");
    match scheme_edits {
        Some(edits) => hash_edit_map(&mut hasher, edits),
        None => {
            hasher.update(&0u64.to_be_bytes());
        }
    }

    hasher.update(b"code");
    hash_value(&mut hasher, code_parsed);

    hasher.update(b"scheme-id");
    update_lengthed(&mut hasher, scheme.as_bytes());

    Fingerprint(hex::encode(hasher.finalize().as_bytes()))
}

fn update_lengthed(hasher: &mut Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

fn hash_edit_map(hasher: &mut Hasher, edits: &BTreeMap<ThemePath, Value>) {
    hasher.update(&(edits.len() as u64).to_be_bytes());
    // BTreeMap iterates in key order; no extra sort needed.
    for (path, value) in edits {
        update_lengthed(hasher, path.to_string().as_bytes());
        hash_value(hasher, value);
    }
}

/// Canonical traversal of a JSON value: object keys visited in sorted order
/// so semantically identical trees hash identically.
fn hash_value(hasher: &mut Hasher, value: &Value) {
    match value {
        Value::Null => {
            hasher.update(b"n");
        }
        Value::Bool(b) => {
            hasher.update(b"b");
            hasher.update(&[*b as u8]);
        }
        Value::Number(n) => {
            hasher.update(b"#");
            update_lengthed(hasher, n.to_string().as_bytes());
        }
        Value::String(s) => {
            hasher.update(b"s");
            update_lengthed(hasher, s.as_bytes());
        }
        Value::Array(items) => {
            hasher.update(b"a");
            hasher.update(&(items.len() as u64).to_be_bytes());
            for item in items {
                hash_value(hasher, item);
            }
        }
        Value::Object(map) => {
            hasher.update(b"o");
            hasher.update(&(map.len() as u64).to_be_bytes());
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                update_lengthed(hasher, key.as_bytes());
                hash_value(hasher, &map[key]);
            }
        }
    }
}
