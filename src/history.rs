//! Undo/redo stacks for design edits.
//!
//! Two independent stacks: visual edits are path-level patches; code
//! overrides are whole-text snapshots, because override text is opaque until
//! parsed and a sub-path diff of arbitrary DSL text is not meaningful.

use crate::tree::ThemePath;
use crate::types::Scope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

/// Default per-stack cap. Oldest entries are evicted FIFO past this bound.
pub const DEFAULT_HISTORY_CAP: usize = 100;

/// A single committed value change. `None` means the path was absent on that
/// side of the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualPatch {
    pub path: ThemePath,
    pub scope: Scope,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl VisualPatch {
    pub fn new(
        path: ThemePath,
        scope: Scope,
        old_value: Option<Value>,
        new_value: Option<Value>,
    ) -> Self {
        VisualPatch {
            path,
            scope,
            old_value,
            new_value,
            timestamp: Utc::now(),
        }
    }

    /// The patch with old/new swapped, as pushed to the opposite stack after
    /// it has been applied.
    fn inverted(&self) -> Self {
        VisualPatch {
            path: self.path.clone(),
            scope: self.scope.clone(),
            old_value: self.new_value.clone(),
            new_value: self.old_value.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// One undoable step on the visual stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VisualEntry {
    /// A single path-level value change.
    Edit(VisualPatch),
    /// Several value changes committed as one step (e.g. clearing a layer).
    Batch(Vec<VisualPatch>),
    /// A title change.
    Title { old: String, new: String },
}

impl VisualEntry {
    fn inverted(&self) -> Self {
        match self {
            VisualEntry::Edit(patch) => VisualEntry::Edit(patch.inverted()),
            VisualEntry::Batch(patches) => {
                VisualEntry::Batch(patches.iter().map(VisualPatch::inverted).collect())
            }
            VisualEntry::Title { old, new } => VisualEntry::Title {
                old: new.clone(),
                new: old.clone(),
            },
        }
    }
}

/// Two independent undo/redo stacks with FIFO eviction past the cap.
#[derive(Debug)]
pub struct HistoryEngine {
    visual_past: VecDeque<VisualEntry>,
    visual_future: Vec<VisualEntry>,
    code_past: VecDeque<String>,
    code_future: Vec<String>,
    cap: usize,
}

impl Default for HistoryEngine {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

impl HistoryEngine {
    pub fn new(cap: usize) -> Self {
        HistoryEngine {
            visual_past: VecDeque::new(),
            visual_future: Vec::new(),
            code_past: VecDeque::new(),
            code_future: Vec::new(),
            cap: cap.max(1),
        }
    }

    /// Record a committed visual change. Any redo chain is invalidated.
    pub fn record_visual(&mut self, entry: VisualEntry) {
        self.visual_future.clear();
        if self.visual_past.len() == self.cap {
            self.visual_past.pop_front();
        }
        self.visual_past.push_back(entry);
    }

    /// Record the code-override text as it was before the mutation being
    /// committed. Any redo chain is invalidated.
    pub fn record_code(&mut self, previous_source_text: String) {
        self.code_future.clear();
        if self.code_past.len() == self.cap {
            self.code_past.pop_front();
        }
        self.code_past.push_back(previous_source_text);
    }

    /// Pop the most recent visual entry for the caller to revert. The
    /// inverted entry moves to the redo side.
    pub fn undo_visual(&mut self) -> Option<VisualEntry> {
        let entry = self.visual_past.pop_back()?;
        self.visual_future.push(entry.inverted());
        Some(entry)
    }

    /// Pop the most recent redo entry for the caller to revert. The inverted
    /// entry moves back to the undo side.
    pub fn redo_visual(&mut self) -> Option<VisualEntry> {
        let entry = self.visual_future.pop()?;
        if self.visual_past.len() == self.cap {
            self.visual_past.pop_front();
        }
        self.visual_past.push_back(entry.inverted());
        Some(entry)
    }

    /// Pop the previous code text; `current_text` moves to the redo side.
    pub fn undo_code(&mut self, current_text: String) -> Option<String> {
        let previous = self.code_past.pop_back()?;
        self.code_future.push(current_text);
        Some(previous)
    }

    /// Pop the next code text; `current_text` moves back to the undo side.
    pub fn redo_code(&mut self, current_text: String) -> Option<String> {
        let next = self.code_future.pop()?;
        if self.code_past.len() == self.cap {
            self.code_past.pop_front();
        }
        self.code_past.push_back(current_text);
        Some(next)
    }

    pub fn can_undo_visual(&self) -> bool {
        !self.visual_past.is_empty()
    }

    pub fn can_redo_visual(&self) -> bool {
        !self.visual_future.is_empty()
    }

    pub fn can_undo_code(&self) -> bool {
        !self.code_past.is_empty()
    }

    pub fn can_redo_code(&self) -> bool {
        !self.code_future.is_empty()
    }

    pub fn visual_depth(&self) -> usize {
        self.visual_past.len()
    }

    /// Empty both stacks. Called before a full load replay so a loaded
    /// design never exposes undo into a previous design's state.
    pub fn clear(&mut self) {
        self.visual_past.clear();
        self.visual_future.clear();
        self.code_past.clear();
        self.code_future.clear();
    }
}
