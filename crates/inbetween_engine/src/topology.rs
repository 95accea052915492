// SPDX-License-Identifier: MIT OR Apache-2.0
//! Polyline pre-conditioning before blending.
//!
//! Two keys can only be blended point by point once they have the same point count and run
//! in the same direction. Neither step changes authored data; they only shape control values.

use kurbo::Point;

const CLOSED_EPSILON: f64 = 1e-9;

/// Resample a polyline to `count` points evenly spaced by arc length.
///
/// Lines that already have `count` points are returned unchanged. Endpoints are preserved.
pub fn resample(points: &[Point], count: usize) -> Vec<Point> {
    if points.len() == count {
        return points.to_vec();
    }
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    if count == 0 {
        return Vec::new();
    }
    if count == 1 || points.len() == 1 {
        return vec![first; count];
    }

    let mut cumulative = Vec::with_capacity(points.len());
    let mut total = 0.0;
    cumulative.push(0.0);
    for pair in points.windows(2) {
        total += pair[0].distance(pair[1]);
        cumulative.push(total);
    }
    if total <= 0.0 {
        return vec![first; count];
    }

    let mut segment = 0;
    (0..count)
        .map(|i| {
            let target = total * i as f64 / (count - 1) as f64;
            while segment + 2 < cumulative.len() && cumulative[segment + 1] < target {
                segment += 1;
            }
            let span = cumulative[segment + 1] - cumulative[segment];
            if span <= 0.0 {
                return points[segment];
            }
            let t = ((target - cumulative[segment]) / span).clamp(0.0, 1.0);
            points[segment].lerp(points[segment + 1], t)
        })
        .collect()
}

/// A polyline whose last point returns to its first
pub fn is_closed(points: &[Point]) -> bool {
    points.len() >= 3
        && points
            .first()
            .zip(points.last())
            .is_some_and(|(a, b)| a.distance(*b) <= CLOSED_EPSILON)
}

/// Sum of squared distances between corresponding points
pub fn cost(a: &[Point], b: &[Point]) -> f64 {
    a.iter().zip(b).map(|(p, q)| (*p - *q).hypot2()).sum()
}

/// Reorder `current` so it runs the same way as `previous`.
///
/// Open lines may be reversed. Closed lines may also start at a different vertex. The original
/// order wins ties, so aligning an already aligned line is a no-op.
pub fn align(previous: &[Point], current: Vec<Point>) -> Vec<Point> {
    if previous.len() != current.len() || current.len() < 2 {
        return current;
    }

    let mut best_cost = cost(previous, &current);
    let mut best: Option<Vec<Point>> = None;
    let mut consider = |candidate: Vec<Point>| {
        let c = cost(previous, &candidate);
        if c < best_cost {
            best_cost = c;
            best = Some(candidate);
        }
    };

    if is_closed(&current) && is_closed(previous) {
        let ring = &current[..current.len() - 1];
        for reversed in [false, true] {
            for shift in 0..ring.len() {
                if shift == 0 && !reversed {
                    continue;
                }
                let mut candidate: Vec<Point> = if reversed {
                    ring.iter().rev().cycle().skip(shift).take(ring.len()).copied().collect()
                } else {
                    ring.iter().cycle().skip(shift).take(ring.len()).copied().collect()
                };
                candidate.push(candidate[0]);
                consider(candidate);
            }
        }
    } else {
        consider(current.iter().rev().copied().collect());
    }

    best.unwrap_or(current)
}
