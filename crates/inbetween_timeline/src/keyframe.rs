// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframes and the drawable samples they hold.

use crate::beat::Beat;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier of a drawable object, shared by all of its samples across keyframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    /// Create a new random object ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Whether a sample was authored or synthesized.
///
/// Only the authoring side turns a sample into [`SampleKind::Key`]. The interpolation engine
/// writes and removes [`SampleKind::Interpolated`] samples and never promotes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SampleKind {
    /// Explicitly authored geometry
    Key,
    /// Geometry reconstructed from neighbouring keys
    #[default]
    Interpolated,
}

/// One object's geometry on one keyframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawableSample {
    /// Object identifier
    pub id: ObjectId,
    /// Polyline control points
    pub points: Vec<Point>,
    /// Authored or synthesized
    pub kind: SampleKind,
}

impl DrawableSample {
    /// Create an authored sample
    pub fn key(id: ObjectId, points: Vec<Point>) -> Self {
        Self {
            id,
            points,
            kind: SampleKind::Key,
        }
    }

    /// Create a synthesized sample
    pub fn interpolated(id: ObjectId, points: Vec<Point>) -> Self {
        Self {
            id,
            points,
            kind: SampleKind::Interpolated,
        }
    }

    /// Is this an authored sample
    pub fn is_key(&self) -> bool {
        self.kind == SampleKind::Key
    }
}

/// A keyframe: a beat offset inside the loop and the samples drawn there.
///
/// Samples are ordered bottom to top, so a later slot stacks above an earlier one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Offset within the loop
    pub beat: Beat,
    /// Samples in stacking order
    pub samples: Vec<DrawableSample>,
}

impl Keyframe {
    /// Create an empty keyframe
    pub fn new(beat: Beat) -> Self {
        Self {
            beat,
            samples: Vec::new(),
        }
    }

    /// Add a sample on top of the stack
    pub fn with_sample(mut self, sample: DrawableSample) -> Self {
        self.samples.push(sample);
        self
    }

    /// True iff any sample is interpolated
    pub fn contains_interpolated(&self) -> bool {
        self.samples.iter().any(|s| s.kind == SampleKind::Interpolated)
    }

    /// True iff every sample is a key
    pub fn is_fully_authored(&self) -> bool {
        self.samples.iter().all(DrawableSample::is_key)
    }

    /// Slot of the first sample with `id`
    pub fn first_slot_of(&self, id: ObjectId) -> Option<usize> {
        self.samples.iter().position(|s| s.id == id)
    }

    /// All slots holding `id`; more than one means the sample set is inconsistent
    pub fn slots_of(&self, id: ObjectId) -> Vec<usize> {
        self.samples
            .iter()
            .enumerate()
            .filter(|(_, s)| s.id == id)
            .map(|(slot, _)| slot)
            .collect()
    }

    /// First sample with `id`
    pub fn sample(&self, id: ObjectId) -> Option<&DrawableSample> {
        self.samples.iter().find(|s| s.id == id)
    }

    /// Does this keyframe hold `id` at all
    pub fn holds(&self, id: ObjectId) -> bool {
        self.samples.iter().any(|s| s.id == id)
    }

    /// Sample count
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}
