// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-object interpolation engine for inbetween.
//!
//! Given a timeline snapshot and one object identifier, the engine plans the edits that make
//! every interpolated sample of that object agree with a cyclic curve through its authored keys:
//! - Seam padding so a plain spline sees neighbours across the loop wrap
//! - Arc-length resampling and orientation alignment of control polylines
//! - Cubic Hermite blending with step holds across authoring gaps
//! - Merging per-object plans into one finalized edit batch
//!
//! ## Architecture
//!
//! `rebuild` is a pure function of the snapshot. It returns an [`EditPlan`]; nothing here
//! mutates a [`Timeline`](inbetween_timeline::Timeline). Plans from one user action go through
//! an [`EditBatchEmitter`] and the resulting batch is applied by the host.

pub mod emitter;
pub mod engine;
pub mod error;
pub mod padding;
pub mod plan;
pub mod spline;
pub mod topology;

pub use emitter::EditBatchEmitter;
pub use engine::{
    rebuild, BatchRebuild, InterpolationSettings, Interpolator, Rebuild, RebuildShape,
    ScrubDirection,
};
pub use error::{Diagnostic, InterpError, InterpResult};
pub use plan::EditPlan;
