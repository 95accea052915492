// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history over keyframe sample lists.
//!
//! Every committed user action becomes one [`ActionRecord`] holding the before/after sample
//! lists of each keyframe it touched. Lists are bincode-encoded, so undo restores them exactly,
//! slot order included.

use inbetween_timeline::DrawableSample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Default undo history depth
pub const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Sequence number of a recorded action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(u64);

impl ActionId {
    /// Get the raw ID value
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Encoded sample list of one keyframe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSnapshot {
    data: Vec<u8>,
}

impl SampleSnapshot {
    /// Encode a sample list
    pub fn capture(samples: &[DrawableSample]) -> Result<Self> {
        Ok(Self {
            data: bincode::serialize(samples)?,
        })
    }

    /// Decode the sample list
    pub fn restore(&self) -> Result<Vec<DrawableSample>> {
        Ok(bincode::deserialize(&self.data)?)
    }

    /// Encoded size in bytes
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

/// Sample lists of one keyframe around an action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyframeChange {
    /// Keyframe index
    pub keyframe: usize,
    /// Samples before the action (for undo)
    pub before: SampleSnapshot,
    /// Samples after the action (for redo)
    pub after: SampleSnapshot,
}

impl KeyframeChange {
    /// Create a change record
    pub fn new(keyframe: usize, before: SampleSnapshot, after: SampleSnapshot) -> Self {
        Self {
            keyframe,
            before,
            after,
        }
    }

    fn byte_len(&self) -> usize {
        self.before.byte_len() + self.after.byte_len()
    }
}

/// One undoable user action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Sequence number
    pub id: ActionId,
    /// Human-readable description
    pub description: String,
    /// Touched keyframes, ascending
    pub changes: Vec<KeyframeChange>,
}

impl ActionRecord {
    /// Encoded size of all snapshots
    pub fn byte_len(&self) -> usize {
        self.changes.iter().map(KeyframeChange::byte_len).sum()
    }
}

/// History statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Actions in the undo stack
    pub undo_count: usize,
    /// Actions in the redo stack
    pub redo_count: usize,
    /// Snapshot bytes held by the undo stack
    pub memory_used: usize,
    /// Maximum history depth
    pub max_depth: usize,
}

/// Undo/redo history manager
#[derive(Debug)]
pub struct History {
    undo_stack: VecDeque<ActionRecord>,
    redo_stack: VecDeque<ActionRecord>,
    next_id: u64,
    max_depth: usize,
    /// Snapshot bytes in the undo stack
    memory_used: usize,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            next_id: 1,
            max_depth,
            memory_used: 0,
        }
    }

    /// Record an action; one without changes is not recorded and returns `None`.
    ///
    /// Recording clears the redo stack and drops the oldest actions beyond the depth limit.
    pub fn record(&mut self, description: &str, changes: Vec<KeyframeChange>) -> Option<ActionId> {
        if changes.is_empty() {
            return None;
        }
        let id = ActionId(self.next_id);
        self.next_id += 1;

        let record = ActionRecord {
            id,
            description: description.to_string(),
            changes,
        };
        self.redo_stack.clear();
        self.memory_used += record.byte_len();
        self.undo_stack.push_back(record);

        while self.undo_stack.len() > self.max_depth {
            if let Some(oldest) = self.undo_stack.pop_front() {
                self.memory_used = self.memory_used.saturating_sub(oldest.byte_len());
            }
        }
        tracing::trace!(id = id.value(), description, "Recorded action");
        Some(id)
    }

    /// Take the last action off the undo stack
    pub fn undo(&mut self) -> Result<ActionRecord> {
        let record = self
            .undo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToUndo)?;

        self.memory_used = self.memory_used.saturating_sub(record.byte_len());
        self.redo_stack.push_back(record.clone());
        Ok(record)
    }

    /// Take the last undone action off the redo stack
    pub fn redo(&mut self) -> Result<ActionRecord> {
        let record = self
            .redo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToRedo)?;

        self.memory_used += record.byte_len();
        self.undo_stack.push_back(record.clone());
        Ok(record)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.memory_used = 0;
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
            memory_used: self.memory_used,
            max_depth: self.max_depth,
        }
    }

    /// Description of the action undo would revert
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|r| r.description.as_str())
    }

    /// Description of the action redo would reapply
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|r| r.description.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
