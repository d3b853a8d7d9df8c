//! Durable snapshot form of a design.
//!
//! A `Snapshot` is what the storage adapter persists. The base theme is
//! stored inline (self-contained source text) or as a reference into the
//! template registry with a checksum recorded at save time.

use crate::design::BaseThemeMetadata;
use crate::tree::hasher::Fingerprint;
use crate::tree::ThemePath;
use crate::types::{SchemeId, SnapshotId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Current snapshot format version. Older versions load; newer ones are
/// rejected as invalid data.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 2;

/// Base-theme serialization strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BaseThemeSource {
    /// Self-contained: the full source text travels with the snapshot.
    Inline {
        source_text: String,
        metadata: BaseThemeMetadata,
    },
    /// Resolved against the template registry at load time.
    Reference {
        template_id: String,
        template_version: String,
        checksum: Fingerprint,
    },
}

/// Persisted edit layers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotEdits {
    #[serde(default)]
    pub neutral: BTreeMap<ThemePath, Value>,
    #[serde(default)]
    pub schemes: BTreeMap<SchemeId, BTreeMap<ThemePath, Value>>,
    /// Raw code-override source text; re-parsed on load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_overrides: Option<String>,
}

/// Editor preferences carried with the design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPreferences {
    pub active_scheme: SchemeId,
}

/// The durable, serialized form of a design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub version: u32,
    pub title: String,
    pub base_theme: BaseThemeSource,
    pub edits: SnapshotEdits,
    pub preferences: SnapshotPreferences,
    /// Fingerprint of the editable state at save time.
    pub checkpoint_fingerprint: Fingerprint,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Collection-listing row: everything the picker UI needs without loading
/// full snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub id: SnapshotId,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub edit_count: usize,
    pub has_code_overrides: bool,
}

impl SnapshotSummary {
    pub fn of(snapshot: &Snapshot) -> Self {
        let edit_count = snapshot.edits.neutral.len()
            + snapshot
                .edits
                .schemes
                .values()
                .map(|edits| edits.len())
                .sum::<usize>();
        SnapshotSummary {
            id: snapshot.id.clone(),
            title: snapshot.title.clone(),
            updated_at: snapshot.updated_at,
            edit_count,
            has_code_overrides: snapshot.edits.code_overrides.is_some(),
        }
    }
}
