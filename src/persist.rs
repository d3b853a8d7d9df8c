//! Save/load engine with conflict-safe persistence.
//!
//! Owns the idle/saving/loading/error status machine, the inline-vs-
//! reference base-theme strategy, normalized-title conflict detection, the
//! ordered load replay, and the conflict-resolution flow. Storage and
//! template resolution stay behind their adapter traits.

pub mod conflict;

pub use conflict::{ConflictDecision, ConflictFlow, ConflictState, TitleConflict};

use crate::design::{BaseThemeMetadata, Design};
use crate::dsl::{DslCompiler, JsonDslCompiler};
use crate::error::EngineError;
use crate::snapshot::{
    BaseThemeSource, Snapshot, SnapshotEdits, SnapshotPreferences, SnapshotSummary,
    SNAPSHOT_FORMAT_VERSION,
};
use crate::store::StorageAdapter;
use crate::template::{template_checksum, TemplateRegistry};
use crate::tree::hasher::Fingerprint;
use crate::tree::ThemePath;
use crate::types::{SchemeId, SnapshotId, Scope};
use blake3::Hasher;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Persistence engine status, readable by the UI as a pure query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceStatus {
    Idle,
    Saving,
    Loading,
    Error,
}

/// What to do when the target title collides with an existing snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Abort with a `Conflict` error carrying the colliding snapshot.
    Fail,
    /// Redirect the write to the colliding snapshot's id.
    Overwrite,
    /// Abort with a `Conflict` error and open the resolution flow.
    Prompt,
}

#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Snapshot to update; defaults to the currently persisted one.
    pub target_id: Option<SnapshotId>,
    /// Title to save under; defaults to the design's title.
    pub title: Option<String>,
    pub on_conflict: ConflictPolicy,
}

impl Default for SaveOptions {
    fn default() -> Self {
        SaveOptions {
            target_id: None,
            title: None,
            on_conflict: ConflictPolicy::Fail,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Replace the whole design; history is cleared before replay.
    Replace,
    /// Apply the snapshot's edit layers over the current design.
    Merge,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub mode: LoadMode,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            mode: LoadMode::Replace,
        }
    }
}

/// Non-fatal conditions surfaced from a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// The live template's checksum differs from the one recorded at save
    /// time. The load proceeds with the live template content.
    TemplateEvolved {
        template_id: String,
        stored: Fingerprint,
        live: Fingerprint,
    },
}

/// One step of the ordered load replay.
enum ReplayCommand {
    SetBaseTheme {
        source_text: String,
        parsed: Value,
        metadata: BaseThemeMetadata,
    },
    SetTitle(String),
    ApplyNeutralEdit(ThemePath, Value),
    ApplySchemeEdit(SchemeId, ThemePath, Value),
    ApplyCodeOverrides(String),
    SetActiveScheme(SchemeId),
}

/// Builder so a partially configured engine fails loudly at construction,
/// not on first use.
#[derive(Default)]
pub struct PersistenceEngineBuilder {
    store: Option<Arc<dyn StorageAdapter>>,
    templates: Option<Arc<dyn TemplateRegistry>>,
    compiler: Option<Arc<dyn DslCompiler>>,
}

impl PersistenceEngineBuilder {
    pub fn store(mut self, store: Arc<dyn StorageAdapter>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn templates(mut self, templates: Arc<dyn TemplateRegistry>) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn compiler(mut self, compiler: Arc<dyn DslCompiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn build(self) -> Result<PersistenceEngine, EngineError> {
        let store = self
            .store
            .ok_or_else(|| EngineError::Init("no storage adapter configured".to_string()))?;
        let mut engine = PersistenceEngine {
            store,
            templates: self.templates,
            compiler: self.compiler.unwrap_or_else(|| Arc::new(JsonDslCompiler)),
            status: PersistenceStatus::Idle,
            last_error: None,
            current_snapshot_id: None,
            collection: Vec::new(),
            conflict: ConflictFlow::new(),
            id_counter: 0,
        };
        engine.refresh_collection()?;
        Ok(engine)
    }
}

pub struct PersistenceEngine {
    store: Arc<dyn StorageAdapter>,
    templates: Option<Arc<dyn TemplateRegistry>>,
    compiler: Arc<dyn DslCompiler>,
    status: PersistenceStatus,
    last_error: Option<String>,
    current_snapshot_id: Option<SnapshotId>,
    collection: Vec<SnapshotSummary>,
    conflict: ConflictFlow,
    id_counter: u64,
}

impl PersistenceEngine {
    pub fn builder() -> PersistenceEngineBuilder {
        PersistenceEngineBuilder::default()
    }

    // --- queries ---

    pub fn status(&self) -> PersistenceStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn current_snapshot_id(&self) -> Option<&str> {
        self.current_snapshot_id.as_deref()
    }

    /// Cached collection listing, newest first.
    pub fn collection(&self) -> &[SnapshotSummary] {
        &self.collection
    }

    pub fn conflict_state(&self) -> &ConflictState {
        self.conflict.state()
    }

    // --- save ---

    /// Serialize the design and persist it, detecting title conflicts
    /// against every snapshot except the update target.
    pub fn save(
        &mut self,
        design: &mut Design,
        options: SaveOptions,
    ) -> Result<SnapshotId, EngineError> {
        self.guard_idle()?;
        self.status = PersistenceStatus::Saving;
        match self.save_inner(design, options) {
            Ok(id) => {
                self.status = PersistenceStatus::Idle;
                self.last_error = None;
                Ok(id)
            }
            Err(e) => {
                self.status = PersistenceStatus::Error;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn save_inner(
        &mut self,
        design: &mut Design,
        options: SaveOptions,
    ) -> Result<SnapshotId, EngineError> {
        let title = options
            .title
            .clone()
            .unwrap_or_else(|| design.title().to_string());
        if title.trim().is_empty() {
            return Err(EngineError::InvalidData("title must not be empty".to_string()));
        }

        let mut target_id = options.target_id.or_else(|| self.current_snapshot_id.clone());

        let conflicting = self
            .store
            .find_by_title(&title)?
            .into_iter()
            .find(|s| Some(&s.id) != target_id.as_ref());
        if let Some(existing) = conflicting {
            match options.on_conflict {
                ConflictPolicy::Fail => {
                    return Err(EngineError::Conflict {
                        id: existing.id,
                        title: existing.title,
                    });
                }
                ConflictPolicy::Prompt => {
                    self.conflict.open(TitleConflict {
                        id: existing.id.clone(),
                        title: existing.title.clone(),
                    });
                    return Err(EngineError::Conflict {
                        id: existing.id,
                        title: existing.title,
                    });
                }
                ConflictPolicy::Overwrite => {
                    debug!(id = %existing.id, "overwrite: redirecting save target");
                    target_id = Some(existing.id);
                }
            }
        }

        if options.title.is_some() && design.title() != title {
            design.replay_title(title.clone());
        }

        let now = Utc::now();
        let (id, created_at) = match &target_id {
            Some(id) => {
                let created_at = self
                    .store
                    .get(id)?
                    .map(|existing| existing.created_at)
                    .unwrap_or(now);
                (id.clone(), created_at)
            }
            None => (self.generate_id(&title), now),
        };

        let snapshot = Snapshot {
            id: id.clone(),
            version: SNAPSHOT_FORMAT_VERSION,
            title,
            base_theme: self.serialize_base_theme(design),
            edits: SnapshotEdits {
                neutral: design.neutral_edits().clone(),
                schemes: design.scheme_edits().clone(),
                code_overrides: if design.code_overrides().source_text.is_empty() {
                    None
                } else {
                    Some(design.code_overrides().source_text.clone())
                },
            },
            preferences: SnapshotPreferences {
                active_scheme: design.active_scheme().to_string(),
            },
            checkpoint_fingerprint: design.content_fingerprint().clone(),
            created_at,
            updated_at: now,
        };

        let store = Arc::clone(&self.store);
        let stored_id = store.transaction(&mut |adapter| {
            if adapter.exists(&snapshot.id)? {
                adapter.update(&snapshot.id, &snapshot)?;
            } else {
                adapter.create(&snapshot)?;
            }
            Ok(snapshot.id.clone())
        })?;

        info!(
            id = %stored_id,
            fingerprint = design.content_fingerprint().short(),
            "design saved"
        );
        self.current_snapshot_id = Some(stored_id.clone());
        design.acknowledge_stored();
        self.refresh_collection()?;
        Ok(stored_id)
    }

    /// Reference strategy only when a registry is configured, the base theme
    /// carries a known template id, and the registry resolves it right now.
    /// Everything else falls back to inline.
    fn serialize_base_theme(&self, design: &Design) -> BaseThemeSource {
        let metadata = &design.base_theme().metadata;
        if let (Some(registry), Some(template_id)) =
            (self.templates.as_ref(), metadata.template_id.as_ref())
        {
            if let Some(record) = registry.get(template_id) {
                return BaseThemeSource::Reference {
                    template_id: template_id.clone(),
                    template_version: record.version,
                    checksum: template_checksum(&record.theme_options),
                };
            }
            warn!(
                template_id = %template_id,
                "template not resolvable, saving base theme inline"
            );
        }
        BaseThemeSource::Inline {
            source_text: design.base_theme().source_text.clone(),
            metadata: metadata.clone(),
        }
    }

    // --- load ---

    /// Fetch a snapshot and replay it into the design. The checkpoint is
    /// taken only after every command has been applied, so the design is
    /// never observed dirty mid-replay.
    pub fn load(
        &mut self,
        design: &mut Design,
        id: &str,
        options: LoadOptions,
    ) -> Result<Vec<LoadWarning>, EngineError> {
        self.guard_idle()?;
        self.status = PersistenceStatus::Loading;
        match self.load_inner(design, id, options) {
            Ok(warnings) => {
                self.status = PersistenceStatus::Idle;
                self.last_error = None;
                Ok(warnings)
            }
            Err(e) => {
                self.status = PersistenceStatus::Error;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn load_inner(
        &mut self,
        design: &mut Design,
        id: &str,
        options: LoadOptions,
    ) -> Result<Vec<LoadWarning>, EngineError> {
        let snapshot = self
            .store
            .get(id)?
            .ok_or_else(|| EngineError::InvalidData(format!("Snapshot not found: {}", id)))?;
        if snapshot.version > SNAPSHOT_FORMAT_VERSION {
            return Err(EngineError::InvalidData(format!(
                "Snapshot format version {} is newer than supported {}",
                snapshot.version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        let mut warnings = Vec::new();
        let (source_text, parsed, metadata) =
            self.resolve_base_theme(&snapshot, &mut warnings)?;

        let mut commands = Vec::new();
        if options.mode == LoadMode::Replace {
            commands.push(ReplayCommand::SetBaseTheme {
                source_text,
                parsed,
                metadata,
            });
            commands.push(ReplayCommand::SetTitle(snapshot.title.clone()));
        }
        for (path, value) in &snapshot.edits.neutral {
            commands.push(ReplayCommand::ApplyNeutralEdit(path.clone(), value.clone()));
        }
        for (scheme, edits) in &snapshot.edits.schemes {
            for (path, value) in edits {
                commands.push(ReplayCommand::ApplySchemeEdit(
                    scheme.clone(),
                    path.clone(),
                    value.clone(),
                ));
            }
        }
        if let Some(code) = &snapshot.edits.code_overrides {
            commands.push(ReplayCommand::ApplyCodeOverrides(code.clone()));
        }
        if options.mode == LoadMode::Replace {
            commands.push(ReplayCommand::SetActiveScheme(
                snapshot.preferences.active_scheme.clone(),
            ));
        }

        if options.mode == LoadMode::Replace {
            // A loaded design must never expose undo into the previous one.
            design.clear_history();
        }

        for command in commands {
            self.apply_replay(design, command);
        }

        if options.mode == LoadMode::Replace {
            design.acknowledge_stored();
            self.current_snapshot_id = Some(snapshot.id.clone());
        }

        info!(
            id = %snapshot.id,
            warnings = warnings.len(),
            "design loaded"
        );
        Ok(warnings)
    }

    fn resolve_base_theme(
        &self,
        snapshot: &Snapshot,
        warnings: &mut Vec<LoadWarning>,
    ) -> Result<(String, Value, BaseThemeMetadata), EngineError> {
        match &snapshot.base_theme {
            BaseThemeSource::Inline {
                source_text,
                metadata,
            } => {
                let parsed = self.compiler.parse(source_text).map_err(|e| {
                    EngineError::InvalidData(format!("base theme failed to parse: {}", e))
                })?;
                Ok((source_text.clone(), parsed, metadata.clone()))
            }
            BaseThemeSource::Reference {
                template_id,
                checksum,
                ..
            } => {
                let registry = self.templates.as_ref().ok_or_else(|| {
                    EngineError::TemplateMissing(format!(
                        "{} (no template registry configured)",
                        template_id
                    ))
                })?;
                let record = registry
                    .get(template_id)
                    .ok_or_else(|| EngineError::TemplateMissing(template_id.clone()))?;

                let live = template_checksum(&record.theme_options);
                if live != *checksum {
                    warn!(
                        template_id = %template_id,
                        stored = checksum.short(),
                        live = live.short(),
                        "template evolved since save, loading live content"
                    );
                    warnings.push(LoadWarning::TemplateEvolved {
                        template_id: template_id.clone(),
                        stored: checksum.clone(),
                        live,
                    });
                }

                let source_text = self.compiler.serialize(&record.theme_options);
                let metadata = BaseThemeMetadata {
                    template_id: Some(template_id.clone()),
                    created_at: snapshot.created_at,
                    last_modified: snapshot.updated_at,
                };
                Ok((source_text, record.theme_options, metadata))
            }
        }
    }

    fn apply_replay(&self, design: &mut Design, command: ReplayCommand) {
        match command {
            ReplayCommand::SetBaseTheme {
                source_text,
                parsed,
                metadata,
            } => design.replay_base_theme(source_text, parsed, metadata),
            ReplayCommand::SetTitle(title) => design.replay_title(title),
            ReplayCommand::ApplyNeutralEdit(path, value) => {
                design.replay_edit(path, value, Scope::Global)
            }
            ReplayCommand::ApplySchemeEdit(scheme, path, value) => {
                design.replay_edit(path, value, Scope::Scheme(scheme))
            }
            ReplayCommand::ApplyCodeOverrides(text) => {
                design.replay_code_overrides(self.compiler.as_ref(), &text)
            }
            ReplayCommand::SetActiveScheme(scheme) => design.replay_active_scheme(scheme),
        }
    }

    // --- rename ---

    /// Renaming a persisted design re-persists immediately under the new
    /// title through the usual conflict path; renaming an unsaved design
    /// only updates the in-memory title.
    pub fn rename(
        &mut self,
        design: &mut Design,
        new_title: &str,
        on_conflict: ConflictPolicy,
    ) -> Result<Option<SnapshotId>, EngineError> {
        if self.current_snapshot_id.is_some() {
            let id = self.save(
                design,
                SaveOptions {
                    target_id: self.current_snapshot_id.clone(),
                    title: Some(new_title.to_string()),
                    on_conflict,
                },
            )?;
            Ok(Some(id))
        } else {
            design.set_title(new_title);
            Ok(None)
        }
    }

    // --- conflict resolution ---

    /// Confirm the open conflict as an overwrite and re-run the save.
    pub fn resolve_conflict_overwrite(
        &mut self,
        design: &mut Design,
    ) -> Result<Option<SnapshotId>, EngineError> {
        match self.conflict.confirm_overwrite() {
            Some(ConflictDecision::Overwrite) => self
                .save(
                    design,
                    SaveOptions {
                        target_id: None,
                        title: None,
                        on_conflict: ConflictPolicy::Overwrite,
                    },
                )
                .map(Some),
            _ => Ok(None),
        }
    }

    /// Resolve the open conflict by saving under a different title. A title
    /// that collides again re-enters the rename state with an error message
    /// attached.
    pub fn resolve_conflict_rename(
        &mut self,
        design: &mut Design,
        new_title: &str,
    ) -> Result<Option<SnapshotId>, EngineError> {
        if matches!(self.conflict.state(), ConflictState::Choose { .. }) {
            self.conflict.begin_rename();
        }
        let collides = self
            .store
            .find_by_title(new_title)?
            .iter()
            .any(|s| Some(&s.id) != self.current_snapshot_id.as_ref());
        match self.conflict.submit_rename(new_title, collides) {
            Some(ConflictDecision::SaveAsNew { title }) => self
                .save(
                    design,
                    SaveOptions {
                        target_id: None,
                        title: Some(title),
                        on_conflict: ConflictPolicy::Fail,
                    },
                )
                .map(Some),
            _ => Ok(None),
        }
    }

    pub fn cancel_conflict(&mut self) {
        self.conflict.cancel();
    }

    /// Forget the current snapshot association. Called when the editing
    /// surface replaces the design wholesale (load-new), so the next save
    /// creates rather than updates.
    pub fn detach_current(&mut self) {
        self.current_snapshot_id = None;
    }

    // --- collection ---

    pub fn delete(&mut self, id: &str) -> Result<bool, EngineError> {
        let removed = self.store.delete(id)?;
        if removed {
            if self.current_snapshot_id.as_deref() == Some(id) {
                self.current_snapshot_id = None;
            }
            self.refresh_collection()?;
        }
        Ok(removed)
    }

    /// Rebuild the cached listing from the store, newest first.
    pub fn refresh_collection(&mut self) -> Result<(), EngineError> {
        let mut summaries: Vec<SnapshotSummary> = self
            .store
            .list()?
            .iter()
            .map(SnapshotSummary::of)
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        self.collection = summaries;
        Ok(())
    }

    // --- internals ---

    fn guard_idle(&self) -> Result<(), EngineError> {
        match self.status {
            PersistenceStatus::Saving | PersistenceStatus::Loading => Err(EngineError::Unknown(
                "a persistence operation is already in flight".to_string(),
            )),
            // Error is a resting state: the next call is the retry.
            PersistenceStatus::Idle | PersistenceStatus::Error => Ok(()),
        }
    }

    fn generate_id(&mut self, title: &str) -> SnapshotId {
        self.id_counter += 1;
        let mut hasher = Hasher::new();
        hasher.update(title.as_bytes());
        hasher.update(&Utc::now().timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
        hasher.update(&self.id_counter.to_be_bytes());
        hex::encode(&hasher.finalize().as_bytes()[..8])
    }
}
