//! Layered theme composition
//!
//! Resolves a design into a single flattened theme-options tree for a
//! requested color scheme. Composition happens at read time, is
//! deterministic, and produces no side effects beyond a content-keyed memo
//! cache. Precedence, lowest to highest: template, neutral edits, scheme
//! edits, resolved code overrides.

use crate::design::Design;
use crate::dsl::{DslCompiler, SCHEME_SUBTREE_KEY};
use crate::tree::hasher::{fingerprint_composition_input, Fingerprint};
use crate::tree::{self, deep_merge, ThemePath};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::trace;

/// Cache bound. Exceeding it drops the whole cache; a tunable, not a
/// correctness invariant.
const MAX_CACHED_COMPOSITIONS: usize = 8;

/// Build the template for a scheme: the base tree's scheme-agnostic
/// remainder with the `schemes.<id>` subtree deep-merged over it.
pub fn build_template(base: &Value, scheme: &str) -> Value {
    let mut remainder = base.clone();
    let subtree = match remainder.as_object_mut() {
        Some(map) => map
            .remove(SCHEME_SUBTREE_KEY)
            .and_then(|schemes| schemes.as_object().and_then(|m| m.get(scheme)).cloned()),
        None => None,
    };
    match subtree {
        Some(scheme_tree) => deep_merge(&remainder, &scheme_tree),
        None => remainder,
    }
}

/// Expand a flattened path/value layer into a tree.
fn layer_tree(edits: &BTreeMap<ThemePath, Value>) -> Value {
    let mut tree = Value::Object(Map::new());
    for (path, value) in edits {
        tree::set(&mut tree, path, value.clone());
    }
    tree
}

/// Pure composition of explicit inputs. `code_parsed` is resolved against
/// the template before folding, since the code DSL may reference template
/// values.
pub fn compose_theme(
    compiler: &dyn DslCompiler,
    base: &Value,
    neutral_edits: &BTreeMap<ThemePath, Value>,
    scheme_edits: Option<&BTreeMap<ThemePath, Value>>,
    code_parsed: &Value,
    scheme: &str,
) -> Value {
    let template = build_template(base, scheme);
    let resolved_code = compiler.resolve_against_template(code_parsed, &template, scheme);

    let mut composed = deep_merge(&template, &layer_tree(neutral_edits));
    if let Some(edits) = scheme_edits {
        composed = deep_merge(&composed, &layer_tree(edits));
    }
    deep_merge(&composed, &layer_tree(&resolved_code))
}

/// Memoizing composition engine. The cache key is a fingerprint of every
/// input plus the scheme, so recomputation only happens when something the
/// composition depends on actually changed.
pub struct CompositionEngine {
    compiler: Arc<dyn DslCompiler>,
    cache: Mutex<HashMap<Fingerprint, Arc<Value>>>,
}

impl CompositionEngine {
    pub fn new(compiler: Arc<dyn DslCompiler>) -> Self {
        CompositionEngine {
            compiler,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Compose the design's theme for a scheme.
    ///
    /// When the code-override layer has a pending parse error, the last
    /// successfully parsed override state is used; a failed parse never
    /// half-applies.
    pub fn compose(&self, design: &Design, scheme: &str) -> Arc<Value> {
        let overrides = design.code_overrides();
        let key = fingerprint_composition_input(
            &design.base_theme().parsed,
            design.neutral_edits(),
            design.scheme_edits_for(scheme),
            &overrides.parsed,
            scheme,
        );

        {
            let cache = self.cache.lock();
            if let Some(composed) = cache.get(&key) {
                trace!(scheme, key = key.short(), "composition cache hit");
                return Arc::clone(composed);
            }
        }

        trace!(scheme, key = key.short(), "composition cache miss");
        let composed = Arc::new(compose_theme(
            self.compiler.as_ref(),
            &design.base_theme().parsed,
            design.neutral_edits(),
            design.scheme_edits_for(scheme),
            &overrides.parsed,
            scheme,
        ));

        let mut cache = self.cache.lock();
        if cache.len() >= MAX_CACHED_COMPOSITIONS {
            cache.clear();
        }
        cache.insert(key, Arc::clone(&composed));
        composed
    }

    /// Drop all memoized results.
    pub fn invalidate(&self) {
        self.cache.lock().clear();
    }
}
