//! Theme-DSL compiler seam.
//!
//! The engine never interprets override text itself; it orchestrates a
//! `DslCompiler` and stores the results. The shipped `JsonDslCompiler`
//! treats the override DSL as JSON whose string leaves may reference
//! template values (`$palette.primary.main`) or derive from them
//! (`darken(palette.primary.main, 10%)` / `lighten(...)`).

use crate::tree::{self, ThemePath};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Key under which a parsed tree nests per-scheme subtrees.
pub const SCHEME_SUBTREE_KEY: &str = "schemes";

#[derive(Debug, Error)]
#[error("{0}")]
pub struct DslParseError(pub String);

/// Compiler for the free-form override layer.
pub trait DslCompiler: Send + Sync {
    /// Parse override or base-theme text into a tree.
    fn parse(&self, text: &str) -> Result<Value, DslParseError>;

    /// Serialize a tree back to canonical source text.
    fn serialize(&self, dsl: &Value) -> String;

    /// Resolve a parsed override tree against a composed template, producing
    /// the flattened path/value map used for composition. Template-relative
    /// constructs (references, color derivations) are evaluated here.
    fn resolve_against_template(
        &self,
        parsed: &Value,
        template: &Value,
        scheme: &str,
    ) -> BTreeMap<ThemePath, Value>;
}

/// JSON-based compiler: overrides are JSON objects; string leaves may be
/// template references or color transforms.
pub struct JsonDslCompiler;

impl DslCompiler for JsonDslCompiler {
    fn parse(&self, text: &str) -> Result<Value, DslParseError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| DslParseError(e.to_string()))?;
        if !value.is_object() {
            return Err(DslParseError("top-level value must be an object".to_string()));
        }
        Ok(value)
    }

    fn serialize(&self, dsl: &Value) -> String {
        serde_json::to_string_pretty(dsl).unwrap_or_else(|_| "{}".to_string())
    }

    fn resolve_against_template(
        &self,
        parsed: &Value,
        template: &Value,
        scheme: &str,
    ) -> BTreeMap<ThemePath, Value> {
        // Per-scheme override sections mirror the base theme's layout: a
        // `schemes.<id>` subtree is merged over the scheme-agnostic rest.
        let effective = match tree::get(parsed, &scheme_subtree_path(scheme)) {
            Some(subtree) => {
                let mut rest = parsed.clone();
                if let Some(map) = rest.as_object_mut() {
                    map.remove(SCHEME_SUBTREE_KEY);
                }
                tree::deep_merge(&rest, subtree)
            }
            None => {
                let mut rest = parsed.clone();
                if let Some(map) = rest.as_object_mut() {
                    map.remove(SCHEME_SUBTREE_KEY);
                }
                rest
            }
        };

        let mut flattened = BTreeMap::new();
        flatten_into(&effective, &mut Vec::new(), &mut flattened);

        for value in flattened.values_mut() {
            if let Value::String(text) = value {
                if let Some(resolved) = resolve_string_leaf(text, template) {
                    *value = resolved;
                }
            }
        }
        flattened
    }
}

fn scheme_subtree_path(scheme: &str) -> ThemePath {
    ThemePath::new([SCHEME_SUBTREE_KEY, scheme]).expect("constant segments are non-empty")
}

/// Depth-first flatten of an object tree into leaf paths. Non-object leaves
/// (including arrays) terminate a path.
fn flatten_into(
    value: &Value,
    prefix: &mut Vec<String>,
    out: &mut BTreeMap<ThemePath, Value>,
) {
    match value.as_object() {
        Some(map) if !map.is_empty() => {
            for (key, child) in map {
                prefix.push(key.clone());
                flatten_into(child, prefix, out);
                prefix.pop();
            }
        }
        _ => {
            if let Ok(path) = ThemePath::new(prefix.clone()) {
                out.insert(path, value.clone());
            }
        }
    }
}

/// Resolve a single string leaf: `$path` references and
/// `darken(path, N%)` / `lighten(path, N%)` transforms. Unresolvable
/// constructs are kept literal so the problem stays visible in the composed
/// output.
fn resolve_string_leaf(text: &str, template: &Value) -> Option<Value> {
    if let Some(reference) = text.strip_prefix('$') {
        let path = ThemePath::parse(reference).ok()?;
        return tree::get(template, &path).cloned();
    }

    for (name, darkening) in [("darken", true), ("lighten", false)] {
        if let Some(args) = parse_color_call(text, name) {
            let (path_text, pct) = args;
            let path = ThemePath::parse(&path_text).ok()?;
            let base = tree::get(template, &path)?.as_str()?;
            let shifted = shift_hex_color(base, pct, darkening)?;
            return Some(Value::String(shifted));
        }
    }
    None
}

/// Parse `name(path, N%)`, returning the path text and fraction.
fn parse_color_call(text: &str, name: &str) -> Option<(String, f64)> {
    let body = text
        .strip_prefix(name)?
        .trim()
        .strip_prefix('(')?
        .strip_suffix(')')?;
    let (path_part, pct_part) = body.split_once(',')?;
    let pct_text = pct_part.trim().strip_suffix('%')?;
    let pct: f64 = pct_text.trim().parse().ok()?;
    if !(0.0..=100.0).contains(&pct) {
        return None;
    }
    Some((path_part.trim().to_string(), pct / 100.0))
}

/// Scale a `#rrggbb` color toward black (darken) or white (lighten).
fn shift_hex_color(hex: &str, fraction: f64, darken: bool) -> Option<String> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
    let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
    let b = u8::from_str_radix(&digits[4..6], 16).ok()?;

    let shift = |channel: u8| -> u8 {
        let c = channel as f64;
        let shifted = if darken {
            c * (1.0 - fraction)
        } else {
            c + (255.0 - c) * fraction
        };
        shifted.round().clamp(0.0, 255.0) as u8
    };

    Some(format!("#{:02x}{:02x}{:02x}", shift(r), shift(g), shift(b)))
}
