//! Shared identifier types for the theme engine.

use serde::{Deserialize, Serialize};

/// Identifier of a named color scheme (e.g. "light", "dark").
pub type SchemeId = String;

/// Identifier of a persisted snapshot.
pub type SnapshotId = String;

/// Scheme the editor starts in when nothing else is recorded.
pub const DEFAULT_SCHEME: &str = "light";

/// Scope of a visual edit: independent of color scheme, or bound to one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Scheme-independent edit.
    Global,
    /// Edit scoped to a single named scheme.
    Scheme(SchemeId),
}

impl Scope {
    /// The scheme this scope targets, if any.
    pub fn scheme(&self) -> Option<&str> {
        match self {
            Scope::Global => None,
            Scope::Scheme(id) => Some(id),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Scheme(id) => write!(f, "{}", id),
        }
    }
}
