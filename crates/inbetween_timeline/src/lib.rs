// SPDX-License-Identifier: MIT OR Apache-2.0
//! Cyclic keyframe timeline for inbetween.
//!
//! This crate holds the data model the interpolation engine reads:
//! - Exact rational beats
//! - Keyframes holding identified drawable samples
//! - Loop-aware root/inter index arithmetic
//! - The keyframe store and its atomic edit batches
//!
//! ## Architecture
//!
//! The store is an arena of keyframes addressed by array position. Object identity is a
//! stable [`ObjectId`] carried by each sample, looked up by linear scan inside one keyframe.

pub mod beat;
pub mod edit;
pub mod error;
pub mod index;
pub mod keyframe;
pub mod timeline;

pub use beat::Beat;
pub use edit::{EditBatch, SampleInsertion, SampleRemoval, SampleReplacement};
pub use error::{TimelineError, TimelineResult};
pub use index::{InterIndex, LoopIndex, RootIndex};
pub use keyframe::{DrawableSample, Keyframe, ObjectId, SampleKind};
pub use timeline::Timeline;

pub use kurbo::Point;
