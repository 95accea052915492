// SPDX-License-Identifier: MIT OR Apache-2.0
//! The keyframe store.
//!
//! Every structural change goes through an operation that validates first and commits
//! second, so readers never see a half-edited timeline.

use crate::beat::Beat;
use crate::edit::EditBatch;
use crate::error::{TimelineError, TimelineResult};
use crate::index::{LoopIndex, RootIndex};
use crate::keyframe::{DrawableSample, Keyframe, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A cyclic sequence of keyframes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Keyframes sorted by beat, first at beat zero
    keyframes: Vec<Keyframe>,
    /// Duration after which playback wraps to keyframe 0
    loop_length: Beat,
}

impl Timeline {
    /// Create a timeline, validating the ordering invariants
    pub fn new(keyframes: Vec<Keyframe>, loop_length: Beat) -> TimelineResult<Self> {
        validate_ordering(&keyframes, loop_length)?;
        Ok(Self {
            keyframes,
            loop_length,
        })
    }

    /// Create `count` empty keyframes evenly spaced one beat apart, looping after `count` beats
    pub fn with_uniform_keyframes(count: usize) -> Self {
        let keyframes = (0..count as i64).map(|i| Keyframe::new(Beat::whole(i))).collect();
        Self {
            keyframes,
            loop_length: Beat::whole(count as i64),
        }
    }

    /// Re-check the ordering invariants, e.g. after deserializing
    pub fn validate(&self) -> TimelineResult<()> {
        validate_ordering(&self.keyframes, self.loop_length)
    }

    /// Loop duration
    pub fn loop_length(&self) -> Beat {
        self.loop_length
    }

    /// Number of keyframes
    pub fn keyframe_count(&self) -> usize {
        self.keyframes.len()
    }

    /// Is the store empty
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// All keyframes
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Keyframe by array index
    pub fn keyframe(&self, index: usize) -> Option<&Keyframe> {
        self.keyframes.get(index)
    }

    /// Mutable access for the authoring side.
    ///
    /// Beats cannot be changed through this handle without breaking ordering; use
    /// [`Timeline::remove_keyframe`] and [`Timeline::insert_keyframe`] to move a keyframe.
    pub fn samples_mut(&mut self, index: usize) -> Option<&mut Vec<DrawableSample>> {
        self.keyframes.get_mut(index).map(|k| &mut k.samples)
    }

    /// Index model over this timeline
    pub fn index(&self) -> TimelineResult<LoopIndex<'_>> {
        LoopIndex::new(&self.keyframes, self.loop_length)
    }

    /// Keyframe addressed by a root index
    pub fn keyframe_at_root(&self, root: RootIndex) -> TimelineResult<&Keyframe> {
        let index = self.index()?.index_at_root(root);
        Ok(&self.keyframes[index])
    }

    /// Every object identifier, in first-seen order
    pub fn object_ids(&self) -> Vec<ObjectId> {
        let mut seen = HashSet::new();
        self.keyframes
            .iter()
            .flat_map(|k| k.samples.iter())
            .filter(|s| seen.insert(s.id))
            .map(|s| s.id)
            .collect()
    }

    /// Insert a keyframe at `index`
    pub fn insert_keyframe(&mut self, index: usize, keyframe: Keyframe) -> TimelineResult<()> {
        if index > self.keyframes.len() {
            return Err(TimelineError::KeyframeOutOfRange {
                index,
                count: self.keyframes.len(),
            });
        }
        let mut keyframes = self.keyframes.clone();
        keyframes.insert(index, keyframe);
        validate_ordering(&keyframes, self.loop_length)?;
        self.keyframes = keyframes;
        Ok(())
    }

    /// Remove and return the keyframe at `index`
    pub fn remove_keyframe(&mut self, index: usize) -> TimelineResult<Keyframe> {
        if index >= self.keyframes.len() {
            return Err(TimelineError::KeyframeOutOfRange {
                index,
                count: self.keyframes.len(),
            });
        }
        let mut keyframes = self.keyframes.clone();
        let removed = keyframes.remove(index);
        validate_ordering(&keyframes, self.loop_length)?;
        self.keyframes = keyframes;
        Ok(removed)
    }

    /// Replace whole sample lists; used to restore undo snapshots
    pub fn replace_samples(
        &mut self,
        lists: impl IntoIterator<Item = (usize, Vec<DrawableSample>)>,
    ) -> TimelineResult<()> {
        let lists: Vec<_> = lists.into_iter().collect();
        if let Some(&(index, _)) = lists.iter().find(|(i, _)| *i >= self.keyframes.len()) {
            return Err(TimelineError::KeyframeOutOfRange {
                index,
                count: self.keyframes.len(),
            });
        }
        for (index, samples) in lists {
            self.keyframes[index].samples = samples;
        }
        Ok(())
    }

    /// Apply a finalized batch atomically and return the touched keyframe indices
    pub fn apply(&mut self, batch: &EditBatch) -> TimelineResult<Vec<usize>> {
        let mut staged: BTreeMap<usize, Vec<DrawableSample>> = BTreeMap::new();
        for index in batch.keyframes() {
            let Some(keyframe) = self.keyframes.get(index) else {
                return Err(TimelineError::KeyframeOutOfRange {
                    index,
                    count: self.keyframes.len(),
                });
            };
            staged.insert(index, keyframe.samples.clone());
        }

        for replacement in &batch.replacements {
            let samples = staged.entry(replacement.keyframe).or_default();
            let len = samples.len();
            let slot = samples.get_mut(replacement.slot).ok_or(TimelineError::SlotOutOfRange {
                keyframe: replacement.keyframe,
                slot: replacement.slot,
                len,
            })?;
            *slot = replacement.sample.clone();
        }

        let mut removals: Vec<_> = batch.removals.iter().collect();
        removals.sort_by(|a, b| (a.keyframe, b.slot).cmp(&(b.keyframe, a.slot)));
        for removal in removals {
            let samples = staged.entry(removal.keyframe).or_default();
            if removal.slot >= samples.len() {
                return Err(TimelineError::SlotOutOfRange {
                    keyframe: removal.keyframe,
                    slot: removal.slot,
                    len: samples.len(),
                });
            }
            if samples[removal.slot].id != removal.id {
                tracing::warn!(
                    keyframe = removal.keyframe,
                    slot = removal.slot,
                    "Removal target does not match the expected object"
                );
            }
            samples.remove(removal.slot);
        }

        let mut insertions: Vec<_> = batch.insertions.iter().collect();
        insertions.sort_by_key(|i| (i.keyframe, i.slot));
        for insertion in insertions {
            let samples = staged.entry(insertion.keyframe).or_default();
            if insertion.slot > samples.len() {
                return Err(TimelineError::SlotOutOfRange {
                    keyframe: insertion.keyframe,
                    slot: insertion.slot,
                    len: samples.len(),
                });
            }
            samples.insert(insertion.slot, insertion.sample.clone());
        }

        let touched: Vec<usize> = staged.keys().copied().collect();
        for (index, samples) in staged {
            self.keyframes[index].samples = samples;
        }
        tracing::debug!(keyframes = touched.len(), edits = batch.len(), "Applied edit batch");
        Ok(touched)
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::with_uniform_keyframes(1)
    }
}

fn validate_ordering(keyframes: &[Keyframe], loop_length: Beat) -> TimelineResult<()> {
    if loop_length.is_negative() {
        return Err(TimelineError::InvalidOrdering(format!(
            "loop length {loop_length} is negative"
        )));
    }
    let Some(first) = keyframes.first() else {
        return Ok(());
    };
    if !first.beat.is_zero() {
        return Err(TimelineError::InvalidOrdering(format!(
            "first keyframe sits at beat {} instead of 0",
            first.beat
        )));
    }
    if let Some(pair) = keyframes.windows(2).find(|w| w[0].beat > w[1].beat) {
        return Err(TimelineError::InvalidOrdering(format!(
            "beat {} follows beat {}",
            pair[1].beat, pair[0].beat
        )));
    }
    if let Some(last) = keyframes.last() {
        if last.beat > loop_length {
            return Err(TimelineError::InvalidOrdering(format!(
                "last keyframe beat {} exceeds loop length {loop_length}",
                last.beat
            )));
        }
    }
    Ok(())
}
