// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loop-aware index arithmetic.
//!
//! Playback runs over an unbounded *root index*: the keyframe index plus however many full
//! loops have elapsed. Scrubbing can move backwards past the loop start, so root indices may be
//! negative. Between two keyframes there is one *inter index*: even inter indices sit on a
//! keyframe, odd ones lie strictly between keyframe `k` and `k + 1`.

use crate::beat::Beat;
use crate::error::{TimelineError, TimelineResult};
use crate::keyframe::Keyframe;

/// Unbounded keyframe position across repeated loops
pub type RootIndex = i64;

/// Sub-keyframe scrub position, two per keyframe
pub type InterIndex = i64;

/// Index model over a non-empty keyframe sequence
#[derive(Debug, Clone, Copy)]
pub struct LoopIndex<'a> {
    keyframes: &'a [Keyframe],
    loop_length: Beat,
}

impl<'a> LoopIndex<'a> {
    /// Build the index model; an empty sequence has no defined cycle
    pub fn new(keyframes: &'a [Keyframe], loop_length: Beat) -> TimelineResult<Self> {
        if keyframes.is_empty() {
            return Err(TimelineError::EmptyTimeline);
        }
        Ok(Self {
            keyframes,
            loop_length,
        })
    }

    /// Number of keyframes in one loop
    pub fn keyframe_count(&self) -> usize {
        self.keyframes.len()
    }

    /// Loop duration
    pub fn loop_length(&self) -> Beat {
        self.loop_length
    }

    fn count(&self) -> i64 {
        self.keyframes.len() as i64
    }

    /// Keyframe index of a root index, in `[0, keyframe_count)`
    pub fn index_at_root(&self, root: RootIndex) -> usize {
        root.rem_euclid(self.count()) as usize
    }

    /// Completed loops before a root index (negative before the first loop)
    pub fn loop_count_at_root(&self, root: RootIndex) -> i64 {
        root.div_euclid(self.count())
    }

    /// Inverse of [`Self::index_at_root`] and [`Self::loop_count_at_root`]
    pub fn root_index(&self, index: usize, loop_count: i64) -> TimelineResult<RootIndex> {
        loop_count
            .checked_mul(self.count())
            .and_then(|base| base.checked_add(index as i64))
            .ok_or_else(|| TimelineError::Overflow(format!("root of keyframe {index} in loop {loop_count}")))
    }

    /// Cumulative beat of a root index
    pub fn root_beat_at_root(&self, root: RootIndex) -> TimelineResult<Beat> {
        let index = self.index_at_root(root);
        self.loop_length
            .checked_mul(self.loop_count_at_root(root))
            .and_then(|start| start.checked_add(self.keyframes[index].beat))
            .ok_or_else(|| TimelineError::Overflow(format!("beat of root index {root}")))
    }

    /// Greatest root index whose cumulative beat is `<= beat`.
    ///
    /// Keyframes sharing one beat resolve to the lowest index.
    pub fn nearest_root_index(&self, beat: Beat) -> TimelineResult<RootIndex> {
        let loops = beat.div_floor(self.loop_length)?;
        let local = beat.rem_euclid(self.loop_length)?;

        // keyframes[0].beat == 0 <= local, so the partition point is at least 1
        let mut index = self
            .keyframes
            .partition_point(|k| k.beat <= local)
            .saturating_sub(1);
        while index > 0 && self.keyframes[index - 1].beat == self.keyframes[index].beat {
            index -= 1;
        }
        self.root_index(index, loops)
    }

    /// Inter index of a keyframe boundary
    pub fn inter_index_at_root(&self, root: RootIndex) -> TimelineResult<InterIndex> {
        root.checked_mul(2)
            .ok_or_else(|| TimelineError::Overflow(format!("inter index of root {root}")))
    }

    /// Keyframe boundary an inter index falls on, or the next one after it
    pub fn root_index_at_inter(&self, inter: InterIndex) -> RootIndex {
        inter.div_euclid(2) + inter.rem_euclid(2)
    }

    /// Inter index of a cumulative beat: on a keyframe, or between it and the next
    pub fn nearest_inter_index(&self, beat: Beat) -> TimelineResult<InterIndex> {
        let root = self.nearest_root_index(beat)?;
        let inter = self.inter_index_at_root(root)?;
        if self.root_beat_at_root(root)? == beat {
            Ok(inter)
        } else {
            Ok(inter + 1)
        }
    }

    /// Forward steps from keyframe `from` to keyframe `to`, in `[0, keyframe_count)`
    pub fn forward_distance(&self, from: usize, to: usize) -> usize {
        (to as i64 - from as i64).rem_euclid(self.count()) as usize
    }

    /// Keyframe `steps` positions after `index`, wrapping
    pub fn offset(&self, index: usize, steps: i64) -> usize {
        (index as i64 + steps.rem_euclid(self.count())).rem_euclid(self.count()) as usize
    }
}
