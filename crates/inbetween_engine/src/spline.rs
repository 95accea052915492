// SPDX-License-Identifier: MIT OR Apache-2.0
//! Piecewise cubic Hermite curve over polyline control values.
//!
//! Knots carry whole polylines; every point is blended independently. Tangents follow the
//! Catmull-Rom rule on non-uniform knot spacing, and a step segment on either side of a knot
//! turns its tangent one-sided so held values never pull on neighbouring blends.

use inbetween_timeline::Beat;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// How a segment moves from its start knot to the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SegmentKind {
    /// Cubic blend
    #[default]
    Smooth,
    /// Hold the start value until the next knot
    Step,
}

/// One curve knot
#[derive(Debug, Clone, PartialEq)]
pub struct Knot {
    /// Unwrapped knot time
    pub time: Beat,
    /// Control polyline
    pub points: Vec<Point>,
    /// Kind of the segment leaving this knot
    pub outgoing: SegmentKind,
    /// Caller tag, reported back by [`CurveValue::Hold`]
    pub source: usize,
}

/// Result of evaluating the curve
#[derive(Debug, Clone, PartialEq)]
pub enum CurveValue {
    /// The value is exactly the knot tagged `source`
    Hold(usize),
    /// A blended polyline
    Blend(Vec<Point>),
}

/// A time-ordered piecewise curve
#[derive(Debug, Clone)]
pub struct Curve {
    knots: Vec<Knot>,
    tangents: Vec<Vec<Vec2>>,
}

impl Curve {
    /// Build a curve from knots sorted by time
    pub fn new(knots: Vec<Knot>) -> Self {
        let tangents = (0..knots.len()).map(|k| tangent_at(&knots, k)).collect();
        Self { knots, tangents }
    }

    /// The knots
    pub fn knots(&self) -> &[Knot] {
        &self.knots
    }

    /// Evaluate at `time`; `None` before the first knot
    pub fn evaluate(&self, time: Beat) -> Option<CurveValue> {
        let k = self.knots.partition_point(|knot| knot.time <= time).checked_sub(1)?;
        let start = &self.knots[k];
        if start.time == time || start.outgoing == SegmentKind::Step {
            return Some(CurveValue::Hold(start.source));
        }
        let Some(end) = self.knots.get(k + 1) else {
            return Some(CurveValue::Hold(start.source));
        };

        // Differences are exact, so the parameter does not depend on the loop offset
        let dt = span(start.time, end.time);
        if dt <= 0.0 || start.points.len() != end.points.len() {
            return Some(CurveValue::Hold(start.source));
        }
        let u = span(start.time, time) / dt;
        let points = start
            .points
            .iter()
            .zip(&end.points)
            .zip(self.tangents[k].iter().zip(&self.tangents[k + 1]))
            .map(|((&p0, &p1), (&m0, &m1))| hermite(p0, m0 * dt, p1, m1 * dt, u))
            .collect();
        Some(CurveValue::Blend(points))
    }
}

/// Cubic Hermite basis on one point
pub fn hermite(p0: Point, m0: Vec2, p1: Point, m1: Vec2, t: f64) -> Point {
    let t2 = t * t;
    let t3 = t2 * t;

    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    (p0.to_vec2() * h00 + m0 * h10 + p1.to_vec2() * h01 + m1 * h11).to_point()
}

/// `to - from` in beats; exact unless the difference leaves the rational range
fn span(from: Beat, to: Beat) -> f64 {
    to.checked_sub(from)
        .map_or_else(|| to.to_f64() - from.to_f64(), |d| d.to_f64())
}

fn slope(a: &Knot, b: &Knot) -> Option<Vec<Vec2>> {
    let dt = span(a.time, b.time);
    if a.outgoing != SegmentKind::Smooth || dt <= 0.0 || a.points.len() != b.points.len() {
        return None;
    }
    Some(a.points.iter().zip(&b.points).map(|(&p, &q)| (q - p) / dt).collect())
}

fn tangent_at(knots: &[Knot], k: usize) -> Vec<Vec2> {
    let len = knots[k].points.len();
    let incoming = k.checked_sub(1).and_then(|prev| slope(&knots[prev], &knots[k]));
    let outgoing = knots.get(k + 1).and_then(|next| slope(&knots[k], next));
    match (incoming, outgoing) {
        (Some(a), Some(b)) => a.iter().zip(&b).map(|(&a, &b)| (a + b) * 0.5).collect(),
        (Some(one), None) | (None, Some(one)) => one,
        (None, None) => vec![Vec2::ZERO; len],
    }
}
