//! The Design aggregate: the single editable unit of theme state.
//!
//! Every mutation applies its change, records an undo entry, and recomputes
//! the content fingerprint synchronously. Dirty-checking compares that
//! fingerprint against the checkpoint captured at the last successful save
//! or load.

use crate::compose;
use crate::dsl::DslCompiler;
use crate::error::EngineError;
use crate::history::{HistoryEngine, VisualEntry, VisualPatch, DEFAULT_HISTORY_CAP};
use crate::template;
use crate::tree::hasher::{fingerprint_design, Fingerprint};
use crate::tree::ThemePath;
use crate::types::{SchemeId, Scope, DEFAULT_SCHEME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Title given to a design created without one.
pub const UNTITLED: &str = "Untitled Theme";

/// Provenance of the base theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseThemeMetadata {
    /// Registry id when the base theme originated from a named template.
    pub template_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl BaseThemeMetadata {
    pub fn new(template_id: Option<String>) -> Self {
        let now = Utc::now();
        BaseThemeMetadata {
            template_id,
            created_at: now,
            last_modified: now,
        }
    }
}

/// The starting theme: source text plus its parsed tree.
#[derive(Debug, Clone)]
pub struct BaseTheme {
    pub source_text: String,
    pub parsed: Value,
    pub metadata: BaseThemeMetadata,
}

/// The free-form override layer. `parsed`/`flattened` always hold the last
/// successfully parsed state; `parse_error` is set when `source_text` is
/// ahead of them.
#[derive(Debug, Clone)]
pub struct CodeOverrides {
    pub source_text: String,
    pub parsed: Value,
    pub flattened: BTreeMap<ThemePath, Value>,
    pub parse_error: Option<String>,
}

impl CodeOverrides {
    fn empty() -> Self {
        CodeOverrides {
            source_text: String::new(),
            parsed: Value::Object(serde_json::Map::new()),
            flattened: BTreeMap::new(),
            parse_error: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source_text.is_empty() && self.flattened.is_empty()
    }
}

/// Which edit layers a `clear_edits` call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearScope {
    /// Scheme-independent edits only.
    Global,
    /// Edits of the active scheme only.
    CurrentScheme,
    /// Neutral edits and every scheme's edits.
    All,
}

/// The mutable aggregate behind the editing surfaces.
pub struct Design {
    title: String,
    base_theme: BaseTheme,
    neutral_edits: BTreeMap<ThemePath, Value>,
    scheme_edits: BTreeMap<SchemeId, BTreeMap<ThemePath, Value>>,
    code_overrides: CodeOverrides,
    active_scheme: SchemeId,
    content_fingerprint: Fingerprint,
    last_persisted_fingerprint: Option<Fingerprint>,
    history: HistoryEngine,
}

impl Design {
    /// Create a fresh design. Without a source, the built-in default
    /// template is used. A brand-new design is not dirty: the checkpoint is
    /// taken immediately, and only an actual edit diverges from it.
    pub fn load_new(
        compiler: &dyn DslCompiler,
        source: Option<&str>,
        metadata: Option<BaseThemeMetadata>,
    ) -> Result<Self, EngineError> {
        let (source_text, parsed, metadata) = match source {
            Some(text) => {
                let parsed = compiler
                    .parse(text)
                    .map_err(|e| EngineError::Parse(e.to_string()))?;
                (
                    text.to_string(),
                    parsed,
                    metadata.unwrap_or_else(|| BaseThemeMetadata::new(None)),
                )
            }
            None => {
                let options = template::default_template_options();
                let text = compiler.serialize(&options);
                (
                    text,
                    options,
                    metadata.unwrap_or_else(|| {
                        BaseThemeMetadata::new(Some(template::DEFAULT_TEMPLATE_ID.to_string()))
                    }),
                )
            }
        };

        let content_fingerprint = fingerprint_design(
            &source_text,
            &BTreeMap::new(),
            &BTreeMap::new(),
            &BTreeMap::new(),
        );
        Ok(Design {
            title: UNTITLED.to_string(),
            base_theme: BaseTheme {
                source_text,
                parsed,
                metadata,
            },
            neutral_edits: BTreeMap::new(),
            scheme_edits: BTreeMap::new(),
            code_overrides: CodeOverrides::empty(),
            active_scheme: DEFAULT_SCHEME.to_string(),
            last_persisted_fingerprint: Some(content_fingerprint.clone()),
            content_fingerprint,
            history: HistoryEngine::new(DEFAULT_HISTORY_CAP),
        })
    }

    // --- queries ---

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn base_theme(&self) -> &BaseTheme {
        &self.base_theme
    }

    pub fn neutral_edits(&self) -> &BTreeMap<ThemePath, Value> {
        &self.neutral_edits
    }

    pub fn scheme_edits(&self) -> &BTreeMap<SchemeId, BTreeMap<ThemePath, Value>> {
        &self.scheme_edits
    }

    pub fn scheme_edits_for(&self, scheme: &str) -> Option<&BTreeMap<ThemePath, Value>> {
        self.scheme_edits.get(scheme)
    }

    pub fn code_overrides(&self) -> &CodeOverrides {
        &self.code_overrides
    }

    pub fn active_scheme(&self) -> &str {
        &self.active_scheme
    }

    pub fn content_fingerprint(&self) -> &Fingerprint {
        &self.content_fingerprint
    }

    pub fn last_persisted_fingerprint(&self) -> Option<&Fingerprint> {
        self.last_persisted_fingerprint.as_ref()
    }

    /// Unsaved changes exist iff a checkpoint exists and differs from the
    /// current fingerprint. A design with no checkpoint is never dirty.
    pub fn is_dirty(&self) -> bool {
        match &self.last_persisted_fingerprint {
            Some(checkpoint) => *checkpoint != self.content_fingerprint,
            None => false,
        }
    }

    pub fn can_undo_visual(&self) -> bool {
        self.history.can_undo_visual()
    }

    pub fn can_redo_visual(&self) -> bool {
        self.history.can_redo_visual()
    }

    pub fn can_undo_code(&self) -> bool {
        self.history.can_undo_code()
    }

    pub fn can_redo_code(&self) -> bool {
        self.history.can_redo_code()
    }

    /// The template the active layers compose over: base tree with the
    /// requested scheme's subtree merged in.
    pub fn template_for(&self, scheme: &str) -> Value {
        compose::build_template(&self.base_theme.parsed, scheme)
    }

    // --- mutations ---

    /// Rename the design in memory. No-op when the title is unchanged.
    pub fn set_title(&mut self, title: &str) {
        if self.title == title {
            return;
        }
        self.history.record_visual(VisualEntry::Title {
            old: self.title.clone(),
            new: title.to_string(),
        });
        self.title = title.to_string();
        self.recompute_fingerprint();
    }

    /// Replace the base theme. All edit layers and both history stacks are
    /// reset: edits against the old base are meaningless against the new
    /// one, and undoing across a base swap would corrupt state.
    pub fn set_base_theme(
        &mut self,
        compiler: &dyn DslCompiler,
        source_text: &str,
        metadata: Option<BaseThemeMetadata>,
    ) -> Result<(), EngineError> {
        let parsed = compiler
            .parse(source_text)
            .map_err(|e| EngineError::Parse(e.to_string()))?;
        // Hand-authored text severs any template association; a caller that
        // wants to keep one passes the metadata explicitly.
        let metadata = metadata.unwrap_or_else(|| {
            let mut m = BaseThemeMetadata::new(None);
            m.created_at = self.base_theme.metadata.created_at;
            m
        });
        self.base_theme = BaseTheme {
            source_text: source_text.to_string(),
            parsed,
            metadata,
        };
        self.neutral_edits.clear();
        self.scheme_edits.clear();
        self.code_overrides = CodeOverrides::empty();
        self.history.clear();
        self.recompute_fingerprint();
        Ok(())
    }

    /// Commit a value edit. Returns `false` (recording nothing) when the
    /// value equals the existing one at that path and scope.
    pub fn add_edit(&mut self, path: ThemePath, value: Value, scope: Scope) -> bool {
        let existing = self.layer(&scope).and_then(|m| m.get(&path)).cloned();
        if existing.as_ref() == Some(&value) {
            debug!(path = %path, scope = %scope, "edit is a no-op, skipping");
            return false;
        }
        self.history.record_visual(VisualEntry::Edit(VisualPatch::new(
            path.clone(),
            scope.clone(),
            existing,
            Some(value.clone()),
        )));
        self.layer_mut(&scope).insert(path, value);
        self.recompute_fingerprint();
        true
    }

    /// Remove a value edit. Returns `false` (recording nothing) when the
    /// path is absent in that scope.
    pub fn remove_edit(&mut self, path: &ThemePath, scope: Scope) -> bool {
        let existing = match self.layer(&scope).and_then(|m| m.get(path)).cloned() {
            Some(value) => value,
            None => return false,
        };
        self.history.record_visual(VisualEntry::Edit(VisualPatch::new(
            path.clone(),
            scope.clone(),
            Some(existing),
            None,
        )));
        self.remove_from_layer(path, &scope);
        self.recompute_fingerprint();
        true
    }

    /// Clear whole edit layers as a single undoable step. Returns the number
    /// of edits removed.
    pub fn clear_edits(&mut self, scope: ClearScope) -> usize {
        let mut patches = Vec::new();
        match scope {
            ClearScope::Global => {
                drain_layer(&mut self.neutral_edits, Scope::Global, &mut patches);
            }
            ClearScope::CurrentScheme => {
                if let Some(mut edits) = self.scheme_edits.remove(&self.active_scheme) {
                    drain_layer(
                        &mut edits,
                        Scope::Scheme(self.active_scheme.clone()),
                        &mut patches,
                    );
                }
            }
            ClearScope::All => {
                drain_layer(&mut self.neutral_edits, Scope::Global, &mut patches);
                let schemes = std::mem::take(&mut self.scheme_edits);
                for (scheme, mut edits) in schemes {
                    drain_layer(&mut edits, Scope::Scheme(scheme), &mut patches);
                }
            }
        }
        if patches.is_empty() {
            return 0;
        }
        let count = patches.len();
        self.history.record_visual(VisualEntry::Batch(patches));
        self.recompute_fingerprint();
        count
    }

    /// Apply new code-override state. `parsed`/`flattened` are `Some` only
    /// on successful parses; on failure the last-good pair stays in place
    /// and `error` is recorded, so composition never sees a half-applied
    /// parse.
    pub fn set_code_overrides(
        &mut self,
        source_text: &str,
        parsed: Option<Value>,
        flattened: Option<BTreeMap<ThemePath, Value>>,
        error: Option<String>,
    ) {
        self.history.record_code(self.code_overrides.source_text.clone());
        self.code_overrides.source_text = source_text.to_string();
        if let (Some(parsed), Some(flattened)) = (parsed, flattened) {
            self.code_overrides.parsed = parsed;
            self.code_overrides.flattened = flattened;
        }
        self.code_overrides.parse_error = error;
        self.recompute_fingerprint();
    }

    /// Parse and commit code-override text through the compiler, resolving
    /// against the active scheme's template. The usual entry point for the
    /// code editing surface.
    pub fn commit_code_overrides(&mut self, compiler: &dyn DslCompiler, source_text: &str) {
        match compiler.parse(source_text) {
            Ok(parsed) => {
                let template = self.template_for(&self.active_scheme.clone());
                let flattened =
                    compiler.resolve_against_template(&parsed, &template, &self.active_scheme);
                self.set_code_overrides(source_text, Some(parsed), Some(flattened), None);
            }
            Err(e) => {
                debug!(error = %e, "code override parse failed, keeping last-good state");
                self.set_code_overrides(source_text, None, None, Some(e.to_string()));
            }
        }
    }

    /// Drop the code-override layer as one undoable step.
    pub fn clear_code_overrides(&mut self) {
        if self.code_overrides.is_empty() && self.code_overrides.parse_error.is_none() {
            return;
        }
        self.history.record_code(self.code_overrides.source_text.clone());
        self.code_overrides = CodeOverrides::empty();
        self.recompute_fingerprint();
    }

    /// Switch the active scheme. Scheme edits for other schemes are kept.
    /// A preference, not an edit: no history entry, no fingerprint change.
    pub fn set_active_scheme(&mut self, scheme: &str) {
        self.active_scheme = scheme.to_string();
    }

    /// Mark the current state as persisted. Called by the persistence
    /// engine after a successful save or a fully replayed load.
    pub fn acknowledge_stored(&mut self) {
        self.last_persisted_fingerprint = Some(self.content_fingerprint.clone());
    }

    // --- undo/redo ---

    pub fn undo_visual(&mut self) -> bool {
        match self.history.undo_visual() {
            Some(entry) => {
                self.revert_entry(&entry);
                self.recompute_fingerprint();
                true
            }
            None => false,
        }
    }

    pub fn redo_visual(&mut self) -> bool {
        match self.history.redo_visual() {
            Some(entry) => {
                // Future entries are stored inverted, so applying the old
                // side restores the redone state.
                self.revert_entry(&entry);
                self.recompute_fingerprint();
                true
            }
            None => false,
        }
    }

    /// Restore the previous code-override text and re-parse it. A re-parse
    /// failure surfaces as `parse_error`; it does not block the undo.
    pub fn undo_code(&mut self, compiler: &dyn DslCompiler) -> bool {
        let current = self.code_overrides.source_text.clone();
        match self.history.undo_code(current) {
            Some(previous) => {
                self.replace_code_text(compiler, previous);
                true
            }
            None => false,
        }
    }

    pub fn redo_code(&mut self, compiler: &dyn DslCompiler) -> bool {
        let current = self.code_overrides.source_text.clone();
        match self.history.redo_code(current) {
            Some(next) => {
                self.replace_code_text(compiler, next);
                true
            }
            None => false,
        }
    }

    /// Empty both history stacks.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    // --- replay (persistence-internal): mutate without recording history ---

    pub(crate) fn replay_base_theme(
        &mut self,
        source_text: String,
        parsed: Value,
        metadata: BaseThemeMetadata,
    ) {
        self.base_theme = BaseTheme {
            source_text,
            parsed,
            metadata,
        };
        self.neutral_edits.clear();
        self.scheme_edits.clear();
        self.code_overrides = CodeOverrides::empty();
        self.recompute_fingerprint();
    }

    pub(crate) fn replay_title(&mut self, title: String) {
        self.title = title;
    }

    pub(crate) fn replay_edit(&mut self, path: ThemePath, value: Value, scope: Scope) {
        self.layer_mut(&scope).insert(path, value);
        self.recompute_fingerprint();
    }

    pub(crate) fn replay_code_overrides(&mut self, compiler: &dyn DslCompiler, source_text: &str) {
        if source_text.is_empty() {
            self.code_overrides = CodeOverrides::empty();
            self.recompute_fingerprint();
            return;
        }
        match compiler.parse(source_text) {
            Ok(parsed) => {
                let template = self.template_for(&self.active_scheme.clone());
                let flattened =
                    compiler.resolve_against_template(&parsed, &template, &self.active_scheme);
                self.code_overrides = CodeOverrides {
                    source_text: source_text.to_string(),
                    parsed,
                    flattened,
                    parse_error: None,
                };
            }
            Err(e) => {
                self.code_overrides = CodeOverrides {
                    source_text: source_text.to_string(),
                    parsed: Value::Object(serde_json::Map::new()),
                    flattened: BTreeMap::new(),
                    parse_error: Some(e.to_string()),
                };
            }
        }
        self.recompute_fingerprint();
    }

    pub(crate) fn replay_active_scheme(&mut self, scheme: String) {
        self.active_scheme = scheme;
    }

    // --- internals ---

    fn replace_code_text(&mut self, compiler: &dyn DslCompiler, text: String) {
        match compiler.parse(&text) {
            Ok(parsed) => {
                let template = self.template_for(&self.active_scheme.clone());
                let flattened =
                    compiler.resolve_against_template(&parsed, &template, &self.active_scheme);
                self.code_overrides.parsed = parsed;
                self.code_overrides.flattened = flattened;
                self.code_overrides.parse_error = None;
            }
            Err(e) => {
                if text.is_empty() {
                    // Empty text is the cleared state, not a parse failure.
                    self.code_overrides.parsed = Value::Object(serde_json::Map::new());
                    self.code_overrides.flattened = BTreeMap::new();
                    self.code_overrides.parse_error = None;
                } else {
                    self.code_overrides.parse_error = Some(e.to_string());
                }
            }
        }
        self.code_overrides.source_text = text;
        self.recompute_fingerprint();
    }

    fn revert_entry(&mut self, entry: &VisualEntry) {
        match entry {
            VisualEntry::Edit(patch) => self.apply_patch_old_side(patch),
            VisualEntry::Batch(patches) => {
                for patch in patches.iter().rev() {
                    self.apply_patch_old_side(patch);
                }
            }
            VisualEntry::Title { old, .. } => {
                self.title = old.clone();
            }
        }
    }

    fn apply_patch_old_side(&mut self, patch: &VisualPatch) {
        match &patch.old_value {
            Some(value) => {
                self.layer_mut(&patch.scope)
                    .insert(patch.path.clone(), value.clone());
            }
            None => {
                self.remove_from_layer(&patch.path, &patch.scope);
            }
        }
    }

    fn layer(&self, scope: &Scope) -> Option<&BTreeMap<ThemePath, Value>> {
        match scope {
            Scope::Global => Some(&self.neutral_edits),
            Scope::Scheme(id) => self.scheme_edits.get(id),
        }
    }

    fn layer_mut(&mut self, scope: &Scope) -> &mut BTreeMap<ThemePath, Value> {
        match scope {
            Scope::Global => &mut self.neutral_edits,
            Scope::Scheme(id) => self.scheme_edits.entry(id.clone()).or_default(),
        }
    }

    /// Remove a path from a layer, pruning scheme entries left empty so the
    /// fingerprint of "edit added then removed" equals the fingerprint of
    /// "never edited".
    fn remove_from_layer(&mut self, path: &ThemePath, scope: &Scope) {
        match scope {
            Scope::Global => {
                self.neutral_edits.remove(path);
            }
            Scope::Scheme(id) => {
                let prune = match self.scheme_edits.get_mut(id) {
                    Some(edits) => {
                        edits.remove(path);
                        edits.is_empty()
                    }
                    None => false,
                };
                if prune {
                    self.scheme_edits.remove(id);
                }
            }
        }
    }

    fn recompute_fingerprint(&mut self) {
        self.content_fingerprint = fingerprint_design(
            &self.base_theme.source_text,
            &self.neutral_edits,
            &self.scheme_edits,
            &self.code_overrides.flattened,
        );
    }
}

fn drain_layer(
    edits: &mut BTreeMap<ThemePath, Value>,
    scope: Scope,
    patches: &mut Vec<VisualPatch>,
) {
    for (path, value) in std::mem::take(edits) {
        patches.push(VisualPatch::new(path, scope.clone(), Some(value), None));
    }
}
