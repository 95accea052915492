// SPDX-License-Identifier: MIT OR Apache-2.0
//! Finalized edit batches, the only way sample lists change.
//!
//! Slot semantics inside one keyframe, in application order:
//! - replacements address slots of the list as it was before the batch
//! - removals address slots of the list as it was before the batch
//! - insertions address final slots and are applied in ascending order

use crate::keyframe::{DrawableSample, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Overwrite one slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleReplacement {
    /// Keyframe index
    pub keyframe: usize,
    /// Slot in the pre-batch list
    pub slot: usize,
    /// New sample
    pub sample: DrawableSample,
}

/// Insert a sample at a final slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleInsertion {
    /// Keyframe index
    pub keyframe: usize,
    /// Slot in the post-batch list
    pub slot: usize,
    /// Inserted sample
    pub sample: DrawableSample,
}

/// Drop one slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRemoval {
    /// Keyframe index
    pub keyframe: usize,
    /// Slot in the pre-batch list
    pub slot: usize,
    /// Identifier expected at that slot
    pub id: ObjectId,
}

/// A merged, sorted set of edits for one logical user action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditBatch {
    /// Replacements sorted by `(keyframe, slot)`
    pub replacements: Vec<SampleReplacement>,
    /// Insertions sorted by `(keyframe, slot)`
    pub insertions: Vec<SampleInsertion>,
    /// Removals sorted by `(keyframe, slot)`
    pub removals: Vec<SampleRemoval>,
}

impl EditBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Nothing to apply; callers must not open an undo transaction for it
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty() && self.insertions.is_empty() && self.removals.is_empty()
    }

    /// Total number of edits
    pub fn len(&self) -> usize {
        self.replacements.len() + self.insertions.len() + self.removals.len()
    }

    /// Keyframes touched by this batch, ascending
    pub fn keyframes(&self) -> BTreeSet<usize> {
        self.replacements
            .iter()
            .map(|r| r.keyframe)
            .chain(self.insertions.iter().map(|i| i.keyframe))
            .chain(self.removals.iter().map(|r| r.keyframe))
            .collect()
    }
}
