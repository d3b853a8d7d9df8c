//! Path/value primitives over nested theme-option trees.
//!
//! A theme-options tree is a plain `serde_json::Value`. This module provides
//! the three primitives the rest of the engine is built on: path lookup,
//! path insertion (creating intermediate objects as needed), and pure
//! deep-merge with override-wins-at-the-leaf semantics.

pub mod hasher;
pub mod merge;
pub mod path;

pub use merge::deep_merge;
pub use path::{InvalidPath, ThemePath};

use serde_json::{Map, Value};

/// Look up the value at `path`, if present.
pub fn get<'a>(tree: &'a Value, path: &ThemePath) -> Option<&'a Value> {
    let mut current = tree;
    for segment in path.segments() {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Set `value` at `path`, creating intermediate objects where absent.
///
/// A non-object intermediate (including the root) is overwritten with an
/// object so the write always lands.
pub fn set(tree: &mut Value, path: &ThemePath, value: Value) {
    if !tree.is_object() {
        *tree = Value::Object(Map::new());
    }
    let mut current = tree;
    let (last, parents) = path
        .segments()
        .split_last()
        .expect("ThemePath is never empty");
    for segment in parents {
        let map = current.as_object_mut().expect("object ensured above");
        let entry = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry;
    }
    current
        .as_object_mut()
        .expect("object ensured above")
        .insert(last.clone(), value);
}

/// Remove and return the value at `path`. Returns `None` if absent.
///
/// Intermediate objects left empty by the removal are kept in place; callers
/// treat empty objects and absent paths identically through `get`.
pub fn delete(tree: &mut Value, path: &ThemePath) -> Option<Value> {
    let (last, parents) = path.segments().split_last()?;
    let mut current = tree;
    for segment in parents {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    current.as_object_mut()?.remove(last)
}
