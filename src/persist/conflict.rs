//! Title-conflict resolution flow.
//!
//! The dialog a conflict drives is UI, but its states and transitions are
//! domain logic: `Closed → Choose → {ConfirmOverwrite, Rename} → Closed`,
//! with a colliding rename re-entering `Rename` carrying an error message.

use crate::types::SnapshotId;
use serde::{Deserialize, Serialize};

/// The snapshot a save collided with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleConflict {
    pub id: SnapshotId,
    pub title: String,
}

/// Current position in the conflict-resolution flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictState {
    Closed,
    /// User is choosing between overwrite, rename, and cancel.
    Choose { conflict: TitleConflict },
    /// User is entering a replacement title. `error` carries the message of
    /// a previous rename attempt that collided again.
    Rename {
        conflict: TitleConflict,
        error: Option<String>,
    },
}

/// Outcome handed back to the persistence engine when the flow closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictDecision {
    Overwrite,
    SaveAsNew { title: String },
    Cancelled,
}

/// State machine driving conflict resolution. Invalid transitions are
/// ignored (the flow stays where it is) rather than panicking, since stray
/// UI events must not corrupt persistence state.
#[derive(Debug, Default)]
pub struct ConflictFlow {
    state: ConflictState,
}

impl Default for ConflictState {
    fn default() -> Self {
        ConflictState::Closed
    }
}

impl ConflictFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ConflictState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != ConflictState::Closed
    }

    /// Enter the flow for a detected conflict.
    pub fn open(&mut self, conflict: TitleConflict) {
        self.state = ConflictState::Choose { conflict };
    }

    /// User confirmed overwriting the conflicting snapshot.
    pub fn confirm_overwrite(&mut self) -> Option<ConflictDecision> {
        match &self.state {
            ConflictState::Choose { .. } => {
                self.state = ConflictState::Closed;
                Some(ConflictDecision::Overwrite)
            }
            _ => None,
        }
    }

    /// User opted to save under a different title.
    pub fn begin_rename(&mut self) {
        if let ConflictState::Choose { conflict } = &self.state {
            self.state = ConflictState::Rename {
                conflict: conflict.clone(),
                error: None,
            };
        }
    }

    /// Submit a replacement title. `collides` is the engine's verdict on the
    /// new title; a collision re-enters `Rename` with the error attached
    /// instead of silently failing.
    pub fn submit_rename(&mut self, title: &str, collides: bool) -> Option<ConflictDecision> {
        match &self.state {
            ConflictState::Rename { conflict, .. } => {
                if collides {
                    self.state = ConflictState::Rename {
                        conflict: conflict.clone(),
                        error: Some(format!("A design titled \"{}\" already exists", title)),
                    };
                    None
                } else {
                    self.state = ConflictState::Closed;
                    Some(ConflictDecision::SaveAsNew {
                        title: title.to_string(),
                    })
                }
            }
            _ => None,
        }
    }

    /// Abandon the flow from any open state.
    pub fn cancel(&mut self) -> Option<ConflictDecision> {
        match self.state {
            ConflictState::Closed => None,
            _ => {
                self.state = ConflictState::Closed;
                Some(ConflictDecision::Cancelled)
            }
        }
    }
}
