//! Coalescing of rapid interactive input into single committed edits.
//!
//! Continuous inputs (color-picker drags, sliders) buffer their latest value
//! per path and commit only after a quiet window, bounding history growth
//! and recomposition churn. The clock is injected so tests drive time
//! explicitly, and supersession is tracked with explicit tokens rather than
//! closure-captured timers.

use crate::tree::ThemePath;
use crate::types::Scope;
use serde_json::Value;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

/// Default quiet window before a buffered edit commits.
pub const DEFAULT_DEBOUNCE_WINDOW_MS: u64 = 180;

/// Millisecond clock source.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall-clock implementation used outside tests.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Handle for one buffered edit. A newer submit for the same path+scope
/// supersedes the older token; superseded and committed tokens are no
/// longer pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitToken(u64);

/// An edit waiting out its quiet window.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEdit {
    pub path: ThemePath,
    pub scope: Scope,
    pub value: Value,
}

struct Slot {
    token: CommitToken,
    edit: PendingEdit,
    deadline: u64,
}

/// Arena of pending edits, one slot per path+scope.
pub struct DebouncedCommits {
    clock: Arc<dyn Clock>,
    window_ms: u64,
    next_token: u64,
    slots: Vec<Slot>,
}

impl DebouncedCommits {
    pub fn new(clock: Arc<dyn Clock>, window_ms: u64) -> Self {
        DebouncedCommits {
            clock,
            window_ms,
            next_token: 0,
            slots: Vec::new(),
        }
    }

    /// Buffer a value for `path`+`scope`, restarting the quiet window. Any
    /// pending edit for the same slot is superseded, not queued.
    pub fn submit(&mut self, path: ThemePath, scope: Scope, value: Value) -> CommitToken {
        self.next_token += 1;
        let token = CommitToken(self.next_token);
        let deadline = self.clock.now_millis() + self.window_ms;
        let edit = PendingEdit { path, scope, value };

        match self
            .slots
            .iter_mut()
            .find(|slot| slot.edit.path == edit.path && slot.edit.scope == edit.scope)
        {
            Some(slot) => {
                trace!(path = %edit.path, "superseding pending edit");
                slot.token = token;
                slot.edit = edit;
                slot.deadline = deadline;
            }
            None => self.slots.push(Slot {
                token,
                edit,
                deadline,
            }),
        }
        token
    }

    /// Release every edit whose quiet window has elapsed. The caller commits
    /// the returned edits to the design.
    pub fn poll(&mut self) -> Vec<PendingEdit> {
        let now = self.clock.now_millis();
        let mut released = Vec::new();
        self.slots.retain_mut(|slot| {
            if slot.deadline <= now {
                released.push(slot.edit.clone());
                false
            } else {
                true
            }
        });
        released
    }

    /// Release every pending edit immediately, window or not. Used when the
    /// interaction ends (pointer up, blur) or before a save.
    pub fn flush(&mut self) -> Vec<PendingEdit> {
        self.slots.drain(..).map(|slot| slot.edit).collect()
    }

    /// Drop a pending edit without committing it.
    pub fn cancel(&mut self, token: CommitToken) -> bool {
        let before = self.slots.len();
        self.slots.retain(|slot| slot.token != token);
        before != self.slots.len()
    }

    /// Whether this token still awaits commit (not superseded, committed,
    /// or cancelled).
    pub fn is_pending(&self, token: CommitToken) -> bool {
        self.slots.iter().any(|slot| slot.token == token)
    }

    pub fn pending_count(&self) -> usize {
        self.slots.len()
    }
}
