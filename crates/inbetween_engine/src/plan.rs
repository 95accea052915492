// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-identifier edit plans.
//!
//! All slots in a plan refer to the sample lists as they were when the plan was computed.
//! The emitter turns them into final slots when several plans are merged.

use inbetween_timeline::{DrawableSample, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overwrite an existing slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedReplacement {
    /// Slot to overwrite
    pub slot: usize,
    /// New sample
    pub sample: DrawableSample,
}

/// Insert before an existing slot (`slot == len` appends)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedInsertion {
    /// Original slot the sample goes in front of
    pub slot: usize,
    /// Inserted sample
    pub sample: DrawableSample,
}

/// Drop an existing slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedRemoval {
    /// Slot to drop
    pub slot: usize,
    /// Identifier found there
    pub id: ObjectId,
}

/// Edits for one identifier, keyed by keyframe index and sorted by slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditPlan {
    /// Replacements per keyframe
    pub replacements: BTreeMap<usize, Vec<PlannedReplacement>>,
    /// Insertions per keyframe
    pub insertions: BTreeMap<usize, Vec<PlannedInsertion>>,
    /// Removals per keyframe
    pub removals: BTreeMap<usize, Vec<PlannedRemoval>>,
    /// Stacking position of the object in its anchor keyframe; orders insertions that land
    /// on the same slot
    #[serde(default)]
    pub stacking: Option<usize>,
}

impl EditPlan {
    /// Create an empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a replacement
    pub fn replace(&mut self, keyframe: usize, slot: usize, sample: DrawableSample) {
        let list = self.replacements.entry(keyframe).or_default();
        let at = list.partition_point(|r| r.slot <= slot);
        list.insert(at, PlannedReplacement { slot, sample });
    }

    /// Record an insertion; insertions at one slot keep their recording order
    pub fn insert(&mut self, keyframe: usize, slot: usize, sample: DrawableSample) {
        let list = self.insertions.entry(keyframe).or_default();
        let at = list.partition_point(|i| i.slot <= slot);
        list.insert(at, PlannedInsertion { slot, sample });
    }

    /// Record a removal
    pub fn remove(&mut self, keyframe: usize, slot: usize, id: ObjectId) {
        let list = self.removals.entry(keyframe).or_default();
        let at = list.partition_point(|r| r.slot <= slot);
        list.insert(at, PlannedRemoval { slot, id });
    }

    /// No edits recorded
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty() && self.insertions.is_empty() && self.removals.is_empty()
    }

    /// Number of edits
    pub fn len(&self) -> usize {
        self.replacements.values().map(Vec::len).sum::<usize>()
            + self.insertions.values().map(Vec::len).sum::<usize>()
            + self.removals.values().map(Vec::len).sum::<usize>()
    }

    /// Sample this plan writes into `keyframe`, if any
    pub fn written(&self, keyframe: usize) -> Option<&DrawableSample> {
        self.replacements
            .get(&keyframe)
            .and_then(|list| list.first())
            .map(|r| &r.sample)
            .or_else(|| {
                self.insertions
                    .get(&keyframe)
                    .and_then(|list| list.first())
                    .map(|i| &i.sample)
            })
    }
}
