//! Error types for the theme composition and persistence engine.

use crate::types::SnapshotId;
use thiserror::Error;

/// Storage-adapter-level errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(SnapshotId),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Engine-level errors surfaced from composition and persistence operations.
///
/// Code-override parse failures are captured on the `Design` (`parse_error`
/// field) rather than raised from composition; `Parse` is returned only when
/// an operation is asked to parse text directly (e.g. setting a base theme).
/// Template checksum drift is a load warning, not an error variant.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Title conflict with snapshot {id} (\"{title}\")")]
    Conflict { id: SnapshotId, title: String },

    #[error("Invalid snapshot data: {0}")]
    InvalidData(String),

    #[error("Template missing: {0}")]
    TemplateMissing(String),

    #[error("Persistence not configured: {0}")]
    Init(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("{0}")]
    Unknown(String),
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::Init(err.to_string())
    }
}
