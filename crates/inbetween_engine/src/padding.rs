// SPDX-License-Identifier: MIT OR Apache-2.0
//! Seam padding for cyclic curves.
//!
//! A spline basis needs neighbours on both sides of every segment. Across the loop seam those
//! neighbours are the keys from the other end of the loop, shifted by one loop length. This
//! module turns a time-ordered key list covering one loop into a longer list whose times keep
//! increasing through both seams, so any non-cyclic spline can consume it unchanged.

use inbetween_timeline::{Beat, TimelineError, TimelineResult};

/// A value pinned to a time
#[derive(Debug, Clone, PartialEq)]
pub struct Control<T> {
    /// Unwrapped time
    pub time: Beat,
    /// Control value
    pub value: T,
}

/// Extend one loop of controls by `before` copies at the front and `after` at the back.
///
/// `controls` must be sorted and span less than `loop_length`. Counts larger than the list
/// wrap around more than once.
pub fn pad_cyclic<T: Clone>(
    controls: &[Control<T>],
    loop_length: Beat,
    before: usize,
    after: usize,
) -> TimelineResult<Vec<Control<T>>> {
    if controls.is_empty() {
        return Ok(Vec::new());
    }
    let len = controls.len() as i64;
    (-(before as i64)..len + after as i64)
        .map(|position| {
            let source = &controls[position.rem_euclid(len) as usize];
            let loops = position.div_euclid(len);
            let time = loop_length
                .checked_mul(loops)
                .and_then(|shift| source.time.checked_add(shift))
                .ok_or_else(|| {
                    TimelineError::Overflow(format!("{} shifted by {loops} loops", source.time))
                })?;
            Ok(Control {
                time,
                value: source.value.clone(),
            })
        })
        .collect()
}
