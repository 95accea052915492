// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline errors.

use thiserror::Error;

/// Errors raised by the timeline model and its index arithmetic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimelineError {
    /// Index arithmetic was requested on a timeline without keyframes
    #[error("Timeline has no keyframes")]
    EmptyTimeline,

    /// Loop-aware beat arithmetic was requested with a zero loop length
    #[error("Timeline loop length is zero")]
    ZeroLoopLength,

    /// A beat literal could not be parsed or had a zero denominator
    #[error("Invalid beat: {0}")]
    InvalidBeat(String),

    /// Keyframe index outside the store
    #[error("Keyframe {index} out of range (count {count})")]
    KeyframeOutOfRange {
        /// Requested index
        index: usize,
        /// Keyframe count at the time of the request
        count: usize,
    },

    /// Sample slot outside a keyframe's sample list
    #[error("Slot {slot} out of range in keyframe {keyframe} (len {len})")]
    SlotOutOfRange {
        /// Keyframe index
        keyframe: usize,
        /// Requested slot
        slot: usize,
        /// Sample count of that keyframe
        len: usize,
    },

    /// Keyframe beats violate the ordering invariants
    #[error("Invalid keyframe ordering: {0}")]
    InvalidOrdering(String),

    /// Beat or index arithmetic left the representable range
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),
}

/// Result type for timeline operations
pub type TimelineResult<T> = std::result::Result<T, TimelineError>;
