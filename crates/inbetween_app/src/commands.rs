// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor commands for undo/redo support.
//!
//! A command only plans: it reads the current timeline and returns a finalized edit batch.
//! The [`Session`](crate::session::Session) applies the batch and records history.

use crate::history::HistoryError;
use inbetween_engine::{BatchRebuild, InterpError, InterpolationSettings, Interpolator, ScrubDirection};
use inbetween_timeline::{
    EditBatch, ObjectId, RootIndex, SampleKind, SampleReplacement, Timeline, TimelineError,
};
use std::collections::HashSet;

/// Trait for editor commands that can be undone/redone
pub trait EditorCommand {
    /// Get a description of this command
    fn description(&self) -> String;

    /// Plan the edits against the current timeline
    fn plan(
        &self,
        timeline: &Timeline,
        settings: &InterpolationSettings,
    ) -> Result<BatchRebuild, CommandError>;
}

/// Error type for command execution
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// History error
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// Timeline error
    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),

    /// Interpolation error
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No sample of the object on that keyframe
    #[error("Object {id} has no sample on keyframe {keyframe}")]
    SampleNotFound {
        /// Keyframe index
        keyframe: usize,
        /// Missing object
        id: ObjectId,
    },
}

/// Rebuild the interpolated samples of some objects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpolateCommand {
    /// Objects to rebuild
    pub ids: Vec<ObjectId>,
    /// Interpolated objects whose slots may be taken over
    pub replacement_ids: HashSet<ObjectId>,
    /// Playhead position
    pub reference_root: RootIndex,
    /// Playhead motion
    pub direction: ScrubDirection,
}

impl InterpolateCommand {
    /// Rebuild `ids` with the playhead at the loop start
    pub fn new(ids: Vec<ObjectId>) -> Self {
        Self {
            ids,
            replacement_ids: HashSet::new(),
            reference_root: 0,
            direction: ScrubDirection::None,
        }
    }

    /// Rebuild every object present in `timeline`
    pub fn all(timeline: &Timeline) -> Self {
        Self::new(timeline.object_ids())
    }

    /// Allow taking over slots of these objects
    pub fn with_replacements(mut self, replacement_ids: impl IntoIterator<Item = ObjectId>) -> Self {
        self.replacement_ids = replacement_ids.into_iter().collect();
        self
    }

    /// Set the playhead
    pub fn at(mut self, reference_root: RootIndex, direction: ScrubDirection) -> Self {
        self.reference_root = reference_root;
        self.direction = direction;
        self
    }
}

impl EditorCommand for InterpolateCommand {
    fn description(&self) -> String {
        match self.ids.as_slice() {
            [id] => format!("Interpolate {id}"),
            ids => format!("Interpolate {} objects", ids.len()),
        }
    }

    fn plan(
        &self,
        timeline: &Timeline,
        settings: &InterpolationSettings,
    ) -> Result<BatchRebuild, CommandError> {
        let interpolator = Interpolator::new(*settings);
        Ok(interpolator.rebuild_many(
            timeline,
            self.ids.iter().copied(),
            &self.replacement_ids,
            self.reference_root,
            self.direction,
        )?)
    }
}

/// Mark one sample as authored or hand it back to the interpolator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetypeCommand {
    /// Keyframe index
    pub keyframe: usize,
    /// Object to retype
    pub id: ObjectId,
    /// New kind
    pub kind: SampleKind,
}

impl RetypeCommand {
    /// Create a retype command
    pub fn new(keyframe: usize, id: ObjectId, kind: SampleKind) -> Self {
        Self { keyframe, id, kind }
    }
}

impl EditorCommand for RetypeCommand {
    fn description(&self) -> String {
        let kind = match self.kind {
            SampleKind::Key => "key",
            SampleKind::Interpolated => "interpolated",
        };
        format!("Mark {} on keyframe {} as {kind}", self.id, self.keyframe)
    }

    fn plan(
        &self,
        timeline: &Timeline,
        _settings: &InterpolationSettings,
    ) -> Result<BatchRebuild, CommandError> {
        let keyframe = timeline
            .keyframe(self.keyframe)
            .ok_or(TimelineError::KeyframeOutOfRange {
                index: self.keyframe,
                count: timeline.keyframe_count(),
            })?;
        let not_found = CommandError::SampleNotFound {
            keyframe: self.keyframe,
            id: self.id,
        };
        let slot = keyframe.first_slot_of(self.id).ok_or(not_found)?;

        let mut batch = EditBatch::new();
        let sample = &keyframe.samples[slot];
        if sample.kind != self.kind {
            let mut retyped = sample.clone();
            retyped.kind = self.kind;
            batch.replacements.push(SampleReplacement {
                keyframe: self.keyframe,
                slot,
                sample: retyped,
            });
        }
        Ok(BatchRebuild {
            batch,
            diagnostics: Vec::new(),
        })
    }
}
