// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine errors and non-fatal diagnostics.

use inbetween_timeline::{ObjectId, TimelineError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Hard precondition failures; everything else degrades to a best-effort plan
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpError {
    /// The timeline cannot be indexed
    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),
}

impl InterpError {
    /// Nothing can be interpolated on this timeline; hosts show this instead of failing
    pub fn is_nothing_to_interpolate(&self) -> bool {
        matches!(
            self,
            Self::Timeline(TimelineError::EmptyTimeline | TimelineError::ZeroLoopLength)
        )
    }
}

/// Result type for engine operations
pub type InterpResult<T> = std::result::Result<T, InterpError>;

/// Recoverable inconsistency found while rebuilding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// A keyframe holds several samples for one identifier; the lowest slot was used
    InconsistentSampleSet {
        /// Keyframe index
        keyframe: usize,
        /// Duplicated identifier
        id: ObjectId,
        /// Number of samples found
        count: usize,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InconsistentSampleSet { keyframe, id, count } => write!(
                f,
                "keyframe {keyframe} holds {count} samples for {id}, using the first"
            ),
        }
    }
}
