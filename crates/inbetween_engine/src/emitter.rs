// SPDX-License-Identifier: MIT OR Apache-2.0
//! Merges per-object plans into one finalized [`EditBatch`].
//!
//! Plans are computed against the same snapshot, so their slots all refer to the pre-batch
//! sample lists. Replacements and removals keep those slots. Insertions are rewritten to final
//! slots: every removal below the original slot shifts it down by one, and every insertion
//! already placed in the same keyframe shifts it up by one.
//!
//! Conflicts between plans:
//! - A slot one plan takes over and another removes stays, holding the takeover
//! - When two plans take over one slot, the first keeps it and the second is inserted below or
//!   above it by stacking position
//! - Insertions at one slot are ordered by their objects' stacking positions

use crate::plan::EditPlan;
use indexmap::IndexMap;
use inbetween_timeline::{
    DrawableSample, EditBatch, ObjectId, SampleInsertion, SampleRemoval, SampleReplacement,
};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

/// Collects the plans of one logical user action
#[derive(Debug, Clone, Default)]
pub struct EditBatchEmitter {
    plans: IndexMap<ObjectId, EditPlan>,
}

impl EditBatchEmitter {
    /// Create an empty emitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the plan for `id`; a second plan for the same object supersedes the first
    pub fn push(&mut self, id: ObjectId, plan: EditPlan) {
        if self.plans.insert(id, plan).is_some() {
            tracing::debug!(%id, "Superseded earlier plan");
        }
    }

    /// Number of collected plans
    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }

    /// True when no collected plan contains an edit
    pub fn is_empty(&self) -> bool {
        self.plans.values().all(EditPlan::is_empty)
    }

    /// Merge everything into a finalized batch; an empty batch means nothing changed
    pub fn finish(self) -> EditBatch {
        let mut keyframes = BTreeSet::new();
        for plan in self.plans.values() {
            keyframes.extend(plan.replacements.keys());
            keyframes.extend(plan.insertions.keys());
            keyframes.extend(plan.removals.keys());
        }

        let mut batch = EditBatch::new();
        for keyframe in keyframes {
            self.merge_keyframe(keyframe, &mut batch);
        }
        tracing::debug!(
            plans = self.plans.len(),
            replacements = batch.replacements.len(),
            insertions = batch.insertions.len(),
            removals = batch.removals.len(),
            "Finalized edit batch"
        );
        batch
    }

    fn merge_keyframe(&self, keyframe: usize, batch: &mut EditBatch) {
        let mut replacements: BTreeMap<usize, (&DrawableSample, usize)> = BTreeMap::new();
        let mut insertions: Vec<(usize, usize, &DrawableSample)> = Vec::new();
        for plan in self.plans.values() {
            let stacking = plan.stacking.unwrap_or(usize::MAX);
            for replacement in plan.replacements.get(&keyframe).into_iter().flatten() {
                match replacements.entry(replacement.slot) {
                    Entry::Vacant(entry) => {
                        entry.insert((&replacement.sample, stacking));
                    }
                    Entry::Occupied(entry) => {
                        tracing::debug!(
                            keyframe,
                            slot = replacement.slot,
                            id = %replacement.sample.id,
                            "Slot already taken over, inserting beside it"
                        );
                        let (_, holder) = *entry.get();
                        let slot = if stacking < holder {
                            replacement.slot
                        } else {
                            replacement.slot + 1
                        };
                        insertions.push((slot, stacking, &replacement.sample));
                    }
                }
            }
            for insertion in plan.insertions.get(&keyframe).into_iter().flatten() {
                insertions.push((insertion.slot, stacking, &insertion.sample));
            }
        }

        // A slot taken over by another object is not freed
        let mut removals: BTreeMap<usize, ObjectId> = BTreeMap::new();
        for removal in self.plans.values().filter_map(|p| p.removals.get(&keyframe)).flatten() {
            if replacements.contains_key(&removal.slot) {
                tracing::debug!(keyframe, slot = removal.slot, "Removal superseded by a takeover");
                continue;
            }
            removals.entry(removal.slot).or_insert(removal.id);
        }

        // Stable sort keeps push order among equal stacking positions
        insertions.sort_by_key(|&(slot, stacking, _)| (slot, stacking));

        batch
            .replacements
            .extend(replacements.into_iter().map(|(slot, (sample, _))| SampleReplacement {
                keyframe,
                slot,
                sample: sample.clone(),
            }));
        batch.removals.extend(
            removals
                .iter()
                .map(|(&slot, &id)| SampleRemoval { keyframe, slot, id }),
        );
        batch
            .insertions
            .extend(insertions.into_iter().enumerate().map(|(placed, (slot, _, sample))| {
                let removed_below = removals.range(..slot).count();
                SampleInsertion {
                    keyframe,
                    slot: slot - removed_below + placed,
                    sample: sample.clone(),
                }
            }));
    }
}
