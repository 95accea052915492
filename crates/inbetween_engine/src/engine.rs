// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-object interpolation.
//!
//! [`Interpolator::rebuild`] reads the authored key samples of one object and plans the edits
//! that bring every other keyframe of the loop in line with the curve through them. It never
//! mutates the timeline; callers hand the resulting plans to an
//! [`EditBatchEmitter`](crate::emitter::EditBatchEmitter).

use crate::emitter::EditBatchEmitter;
use crate::error::{Diagnostic, InterpResult};
use crate::padding::{pad_cyclic, Control};
use crate::plan::EditPlan;
use crate::spline::{Curve, CurveValue, Knot, SegmentKind};
use crate::topology::{align, resample};
use inbetween_timeline::{
    Beat, DrawableSample, EditBatch, Keyframe, LoopIndex, ObjectId, Point, RootIndex, Timeline,
    TimelineError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::Range;

/// Direction the playhead was moving when the rebuild was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ScrubDirection {
    /// Playing or dragging forward
    Forward,
    /// Dragging backward
    Backward,
    /// Standing still
    #[default]
    None,
}

/// Tunables for curve construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationSettings {
    /// Largest number of keyless keyframes a smooth segment may span
    pub max_smooth_gap: usize,
    /// Keys duplicated across each loop seam
    pub seam_padding: usize,
    /// Extra keys padded on the side the playhead is moving towards
    pub scrub_lookahead: usize,
}

impl Default for InterpolationSettings {
    fn default() -> Self {
        Self {
            max_smooth_gap: 1,
            seam_padding: 2,
            scrub_lookahead: 1,
        }
    }
}

/// Which branch a rebuild took
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebuildShape {
    /// No key samples; stray interpolated samples are removed
    Extinct,
    /// One key sample, copied everywhere
    Constant,
    /// A curve through two or more keys
    Curve {
        /// Every key is reachable from the reference key without crossing an authoring gap
        full_wrap: bool,
    },
}

/// Outcome of rebuilding one object
#[derive(Debug, Clone, PartialEq)]
pub struct Rebuild {
    /// Rebuilt object
    pub id: ObjectId,
    /// Branch taken
    pub shape: RebuildShape,
    /// Edits to apply
    pub plan: EditPlan,
    /// Keyframe array ranges that were evaluated, in sweep order
    pub ranges: Vec<Range<usize>>,
    /// Recoverable inconsistencies found on the way
    pub diagnostics: Vec<Diagnostic>,
}

/// Merged outcome of rebuilding several objects for one user action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchRebuild {
    /// Finalized edits
    pub batch: EditBatch,
    /// Diagnostics from every rebuild
    pub diagnostics: Vec<Diagnostic>,
}

/// An authored key sample
#[derive(Debug, Clone, Copy)]
struct KeySample<'t> {
    index: usize,
    beat: Beat,
    points: &'t [Point],
}

/// Relation between two cyclically consecutive keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Link {
    kind: SegmentKind,
    /// Every keyframe strictly between the keys already holds the object
    bridged: bool,
}

impl Link {
    fn closes_run(self) -> bool {
        self.kind == SegmentKind::Step && !self.bridged
    }
}

/// Plans interpolation edits
#[derive(Debug, Clone, Default)]
pub struct Interpolator {
    settings: InterpolationSettings,
}

impl Interpolator {
    /// Create an interpolator
    pub fn new(settings: InterpolationSettings) -> Self {
        Self { settings }
    }

    /// Current settings
    pub fn settings(&self) -> &InterpolationSettings {
        &self.settings
    }

    /// Plan the edits that make every non-key sample of `id` agree with its keys.
    ///
    /// `replacement_ids` name interpolated samples of other objects whose slots may be taken
    /// over where `id` is missing. `reference_root` is the playhead position; it decides where
    /// the sweep over the loop starts and which keyframe supplies the stacking order.
    pub fn rebuild(
        &self,
        timeline: &Timeline,
        id: ObjectId,
        replacement_ids: &HashSet<ObjectId>,
        reference_root: RootIndex,
        direction: ScrubDirection,
    ) -> InterpResult<Rebuild> {
        let index = timeline.index()?;
        let loop_length = index.loop_length();
        if loop_length.is_zero() || loop_length.is_negative() {
            return Err(TimelineError::ZeroLoopLength.into());
        }
        let _span = tracing::debug_span!("rebuild", %id, reference_root).entered();

        let keyframes = timeline.keyframes();
        let count = keyframes.len();
        let reference = index.index_at_root(reference_root);

        let mut diagnostics = Vec::new();
        let keys = collect_keys(keyframes, id, &mut diagnostics);
        let fki = keys
            .iter()
            .rposition(|k| k.index <= reference)
            .unwrap_or(keys.len().saturating_sub(1));
        let anchor = if keyframes[reference].holds(id) {
            reference
        } else {
            keys.get(fki).map_or(reference, |k| k.index)
        };
        let mut writer = Writer::new(keyframes, id, replacement_ids, anchor);

        let (shape, ranges) = match keys.as_slice() {
            [] => {
                writer.remove_all();
                (RebuildShape::Extinct, Vec::new())
            }
            [only] => {
                for j in 0..count {
                    if j == only.index {
                        writer.reconcile(j);
                    } else {
                        writer.write(j, only.points.to_vec());
                    }
                }
                (RebuildShape::Constant, loop_ranges(0, count, count))
            }
            _ => self.sweep(&index, keyframes, &keys, fki, direction, &mut writer)?,
        };

        let plan = writer.finish();
        tracing::debug!(keys = keys.len(), edits = plan.len(), ?shape, "Rebuilt object");
        Ok(Rebuild {
            id,
            shape,
            plan,
            ranges,
            diagnostics,
        })
    }

    /// Rebuild several objects against one timeline snapshot and merge the plans.
    ///
    /// Later identifiers win when the same one appears twice.
    pub fn rebuild_many(
        &self,
        timeline: &Timeline,
        ids: impl IntoIterator<Item = ObjectId>,
        replacement_ids: &HashSet<ObjectId>,
        reference_root: RootIndex,
        direction: ScrubDirection,
    ) -> InterpResult<BatchRebuild> {
        let mut emitter = EditBatchEmitter::new();
        let mut diagnostics = Vec::new();
        for id in ids {
            let rebuild = self.rebuild(timeline, id, replacement_ids, reference_root, direction)?;
            diagnostics.extend(rebuild.diagnostics);
            emitter.push(id, rebuild.plan);
        }
        Ok(BatchRebuild {
            batch: emitter.finish(),
            diagnostics,
        })
    }

    fn sweep(
        &self,
        index: &LoopIndex<'_>,
        keyframes: &[Keyframe],
        keys: &[KeySample<'_>],
        fki: usize,
        direction: ScrubDirection,
        writer: &mut Writer<'_>,
    ) -> InterpResult<(RebuildShape, Vec<Range<usize>>)> {
        let m = keys.len();
        let count = index.keyframe_count();
        let loop_length = index.loop_length();

        let links: Vec<Link> = (0..m)
            .map(|k| self.link(index, keyframes, writer.id, keys[k].index, keys[(k + 1) % m].index))
            .collect();
        let full_wrap = !links.iter().any(|l| l.closes_run());

        // Walk back from the reference key to the start of its authored run
        let mut first = fki;
        if !full_wrap {
            while !links[(first + m - 1) % m].closes_run() {
                first = (first + m - 1) % m;
            }
        }
        let last = (first + m - 1) % m;
        let start = keys[first].index;
        let unwrap = |j: usize, beat: Beat| -> InterpResult<Beat> {
            if j >= start {
                return Ok(beat);
            }
            beat.checked_add(loop_length)
                .ok_or_else(|| TimelineError::Overflow(format!("{beat} + {loop_length}")).into())
        };

        let controls = (0..m)
            .map(|q| -> InterpResult<Control<(usize, SegmentKind)>> {
                let k = (first + q) % m;
                let outgoing = if k == last && !full_wrap {
                    SegmentKind::Step
                } else {
                    links[k].kind
                };
                Ok(Control {
                    time: unwrap(keys[k].index, keys[k].beat)?,
                    value: (k, outgoing),
                })
            })
            .collect::<InterpResult<Vec<_>>>()?;

        let shaped = shape_controls(keys);
        let (before, after) = self.padding(direction);
        let padded = pad_cyclic(&controls, loop_length, before, after)?;
        let curve = Curve::new(
            padded
                .into_iter()
                .map(|control| {
                    let (k, outgoing) = control.value;
                    Knot {
                        time: control.time,
                        points: shaped[k].clone(),
                        outgoing,
                        source: k,
                    }
                })
                .collect(),
        );
        tracing::trace!(knots = curve.knots().len(), full_wrap, start, "Built curve");

        for step in 0..count {
            let j = index.offset(start, step as i64);
            if keys.binary_search_by_key(&j, |k| k.index).is_ok() {
                writer.reconcile(j);
                continue;
            }
            match curve.evaluate(unwrap(j, keyframes[j].beat)?) {
                Some(CurveValue::Hold(k)) => writer.write(j, keys[k].points.to_vec()),
                Some(CurveValue::Blend(points)) => writer.write(j, points),
                None => tracing::trace!(keyframe = j, "Keyframe precedes the curve"),
            }
        }

        Ok((
            RebuildShape::Curve { full_wrap },
            loop_ranges(start, count, count),
        ))
    }

    fn link(
        &self,
        index: &LoopIndex<'_>,
        keyframes: &[Keyframe],
        id: ObjectId,
        from: usize,
        to: usize,
    ) -> Link {
        let distance = index.forward_distance(from, to);
        let between = distance.saturating_sub(1);
        let kind = if between <= self.settings.max_smooth_gap {
            SegmentKind::Smooth
        } else {
            SegmentKind::Step
        };
        let bridged = (1..distance).all(|s| keyframes[index.offset(from, s as i64)].holds(id));
        Link { kind, bridged }
    }

    fn padding(&self, direction: ScrubDirection) -> (usize, usize) {
        let lookahead = self.settings.scrub_lookahead;
        let before = self.settings.seam_padding.max(1)
            + if direction == ScrubDirection::Backward { lookahead } else { 0 };
        let after = self.settings.seam_padding.max(2)
            + if direction == ScrubDirection::Forward { lookahead } else { 0 };
        (before, after)
    }
}

/// Rebuild with default settings
pub fn rebuild(
    timeline: &Timeline,
    id: ObjectId,
    replacement_ids: &HashSet<ObjectId>,
    reference_root: RootIndex,
    direction: ScrubDirection,
) -> InterpResult<Rebuild> {
    Interpolator::default().rebuild(timeline, id, replacement_ids, reference_root, direction)
}

fn collect_keys<'t>(
    keyframes: &'t [Keyframe],
    id: ObjectId,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<KeySample<'t>> {
    let mut keys = Vec::new();
    for (index, keyframe) in keyframes.iter().enumerate() {
        let slots = keyframe.slots_of(id);
        if slots.len() > 1 {
            tracing::warn!(keyframe = index, %id, count = slots.len(), "Inconsistent sample set");
            diagnostics.push(Diagnostic::InconsistentSampleSet {
                keyframe: index,
                id,
                count: slots.len(),
            });
        }
        if let Some(sample) = slots.iter().map(|&s| &keyframe.samples[s]).find(|s| s.is_key()) {
            keys.push(KeySample {
                index,
                beat: keyframe.beat,
                points: &sample.points,
            });
        }
    }
    keys
}

/// Resample every key to a common point count and chain their orientation in array order
fn shape_controls(keys: &[KeySample<'_>]) -> Vec<Vec<Point>> {
    let count = keys.iter().map(|k| k.points.len()).max().unwrap_or(0);
    let mut shaped: Vec<Vec<Point>> = Vec::with_capacity(keys.len());
    for key in keys {
        let points = resample(key.points, count);
        let points = match shaped.last() {
            Some(previous) => align(previous, points),
            None => points,
        };
        shaped.push(points);
    }
    shaped
}

/// `span` keyframes starting at `start`, split where they wrap past the array end
fn loop_ranges(start: usize, span: usize, count: usize) -> Vec<Range<usize>> {
    if span == 0 {
        Vec::new()
    } else if start + span <= count {
        vec![start..start + span]
    } else {
        vec![start..count, 0..start + span - count]
    }
}

/// Turns computed values into plan entries against the untouched snapshot
struct Writer<'t> {
    keyframes: &'t [Keyframe],
    id: ObjectId,
    replacement_ids: &'t HashSet<ObjectId>,
    /// Objects stacked above `id` in the anchor keyframe
    upper: HashSet<ObjectId>,
    plan: EditPlan,
}

impl<'t> Writer<'t> {
    fn new(
        keyframes: &'t [Keyframe],
        id: ObjectId,
        replacement_ids: &'t HashSet<ObjectId>,
        anchor: usize,
    ) -> Self {
        let anchor = &keyframes[anchor];
        let stacking = anchor.first_slot_of(id);
        let upper = stacking
            .map(|slot| {
                anchor.samples[slot + 1..]
                    .iter()
                    .map(|s| s.id)
                    .filter(|other| *other != id)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            keyframes,
            id,
            replacement_ids,
            upper,
            plan: EditPlan {
                stacking,
                ..EditPlan::default()
            },
        }
    }

    /// Make keyframe `j` show `points` for the object
    fn write(&mut self, j: usize, points: Vec<Point>) {
        let keyframe = &self.keyframes[j];
        let slots = keyframe.slots_of(self.id);
        if slots.iter().any(|&s| keyframe.samples[s].is_key()) {
            self.reconcile(j);
            return;
        }

        match slots.first() {
            Some(&slot) => {
                if keyframe.samples[slot].points != points {
                    self.plan
                        .replace(j, slot, DrawableSample::interpolated(self.id, points));
                }
            }
            None => {
                let inherited = keyframe
                    .samples
                    .iter()
                    .position(|s| !s.is_key() && self.replacement_ids.contains(&s.id));
                match inherited {
                    Some(slot) => {
                        self.plan
                            .replace(j, slot, DrawableSample::interpolated(self.id, points));
                    }
                    None => {
                        let slot = keyframe
                            .samples
                            .iter()
                            .position(|s| self.upper.contains(&s.id))
                            .unwrap_or(keyframe.samples.len());
                        self.plan
                            .insert(j, slot, DrawableSample::interpolated(self.id, points));
                    }
                }
            }
        }
        self.reconcile(j);
    }

    /// Drop interpolated duplicates, keeping the authoritative slot
    fn reconcile(&mut self, j: usize) {
        let keyframe = &self.keyframes[j];
        let slots = keyframe.slots_of(self.id);
        let keep = slots
            .iter()
            .copied()
            .find(|&s| keyframe.samples[s].is_key())
            .or_else(|| slots.first().copied());
        for slot in slots {
            if Some(slot) != keep && !keyframe.samples[slot].is_key() {
                self.plan.remove(j, slot, self.id);
            }
        }
    }

    /// Drop every interpolated sample of the object
    fn remove_all(&mut self) {
        for (j, keyframe) in self.keyframes.iter().enumerate() {
            for slot in keyframe.slots_of(self.id) {
                if !keyframe.samples[slot].is_key() {
                    self.plan.remove(j, slot, self.id);
                }
            }
        }
    }

    fn finish(self) -> EditPlan {
        self.plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn line(y: f64) -> Vec<Point> {
        vec![Point::new(0.0, y), Point::new(10.0, y)]
    }

    fn timeline_with_keys(count: usize, id: ObjectId, keys: &[(usize, Vec<Point>)]) -> Timeline {
        let mut timeline = Timeline::with_uniform_keyframes(count);
        for (index, points) in keys {
            timeline
                .samples_mut(*index)
                .unwrap()
                .push(DrawableSample::key(id, points.clone()));
        }
        timeline
    }

    fn run(timeline: &Timeline, id: ObjectId, reference: RootIndex) -> Rebuild {
        rebuild(timeline, id, &HashSet::new(), reference, ScrubDirection::None).unwrap()
    }

    fn apply(timeline: &mut Timeline, rebuild: Rebuild) {
        let mut emitter = EditBatchEmitter::new();
        emitter.push(rebuild.id, rebuild.plan);
        timeline.apply(&emitter.finish()).unwrap();
    }

    fn points_at(timeline: &Timeline, keyframe: usize, id: ObjectId) -> Vec<Point> {
        timeline.keyframe(keyframe).unwrap().sample(id).unwrap().points.clone()
    }

    #[test]
    fn test_single_key_is_copied_everywhere() {
        let id = ObjectId::new();
        let mut timeline = timeline_with_keys(5, id, &[(2, line(3.0))]);
        let rebuild = run(&timeline, id, 2);
        assert_eq!(rebuild.shape, RebuildShape::Constant);
        apply(&mut timeline, rebuild);

        let mut interpolated = 0;
        for keyframe in timeline.keyframes() {
            let sample = keyframe.sample(id).unwrap();
            assert_eq!(sample.points, line(3.0));
            if !sample.is_key() {
                interpolated += 1;
            }
        }
        assert_eq!(interpolated, 4);
    }

    #[test]
    fn test_second_rebuild_is_empty() {
        let id = ObjectId::new();
        let cases = [
            vec![(0, line(0.0))],
            vec![(0, line(0.0)), (2, line(10.0))],
            vec![(0, line(0.0)), (3, line(10.0))],
            vec![(1, line(0.0)), (2, line(4.0)), (5, line(-2.0))],
            vec![
                (0, line(0.0)),
                (2, vec![Point::new(0.0, 5.0), Point::new(5.0, 6.0), Point::new(10.0, 5.0)]),
            ],
        ];
        for keys in cases {
            let mut timeline = timeline_with_keys(6, id, &keys);
            for reference in [0, 4, -3] {
                let first = run(&timeline, id, reference);
                apply(&mut timeline, first);
                let second = run(&timeline, id, reference);
                assert!(second.plan.is_empty(), "keys {keys:?} reference {reference}");
            }
        }
    }

    #[test]
    fn test_seam_segment_blends_across_wrap() {
        let id = ObjectId::new();
        let mut timeline = timeline_with_keys(4, id, &[(0, line(0.0)), (2, line(10.0))]);
        let rebuild = run(&timeline, id, 0);
        assert_eq!(rebuild.shape, RebuildShape::Curve { full_wrap: true });
        assert_eq!(rebuild.ranges, vec![0..4]);
        apply(&mut timeline, rebuild);

        for keyframe in [1, 3] {
            let points = points_at(&timeline, keyframe, id);
            assert_eq!(points.len(), 2);
            assert_relative_eq!(points[0].y, 5.0, epsilon = 1e-9);
            assert_relative_eq!(points[1].y, 5.0, epsilon = 1e-9);
            assert_relative_eq!(points[1].x, 10.0, epsilon = 1e-9);
            assert!(!timeline.keyframe(keyframe).unwrap().sample(id).unwrap().is_key());
        }
    }

    #[test]
    fn test_reference_does_not_change_values() {
        let id = ObjectId::new();
        let keys = [(0, line(0.0)), (2, line(10.0)), (4, line(4.0))];
        let from_start = run(&timeline_with_keys(6, id, &keys), id, 0);
        let from_end = run(&timeline_with_keys(6, id, &keys), id, 5);
        assert_eq!(from_start.ranges, vec![0..6]);
        assert_eq!(from_end.ranges, vec![4..6, 0..4]);
        for keyframe in [1, 3, 5] {
            assert!(from_start.plan.written(keyframe).is_some());
            assert_eq!(from_start.plan.written(keyframe), from_end.plan.written(keyframe));
        }
    }

    #[test]
    fn test_wide_gap_holds_earlier_key() {
        let id = ObjectId::new();
        let mut timeline = timeline_with_keys(4, id, &[(0, line(0.0)), (3, line(10.0))]);
        let rebuild = run(&timeline, id, 0);
        assert_eq!(rebuild.shape, RebuildShape::Curve { full_wrap: false });
        assert_eq!(rebuild.ranges, vec![3..4, 0..3]);
        apply(&mut timeline, rebuild);
        assert_eq!(points_at(&timeline, 1, id), line(0.0));
        assert_eq!(points_at(&timeline, 2, id), line(0.0));

        // Once the gap is filled the run closes over the whole loop
        let again = run(&timeline, id, 0);
        assert_eq!(again.shape, RebuildShape::Curve { full_wrap: true });
        assert!(again.plan.is_empty());
    }

    #[test]
    fn test_larger_smooth_gap_blends() {
        let id = ObjectId::new();
        let timeline = timeline_with_keys(4, id, &[(0, line(0.0)), (3, line(9.0))]);
        let interpolator = Interpolator::new(InterpolationSettings {
            max_smooth_gap: 2,
            ..Default::default()
        });
        let rebuild = interpolator
            .rebuild(&timeline, id, &HashSet::new(), 0, ScrubDirection::Forward)
            .unwrap();
        let written = rebuild.plan.written(1).unwrap();
        assert!(written.points[0].y > 0.0 && written.points[0].y < 9.0);
    }

    #[test]
    fn test_insertion_keeps_stacking_order() {
        let id = ObjectId::new();
        let below = ObjectId::new();
        let above = ObjectId::new();
        let mut timeline = Timeline::with_uniform_keyframes(3);
        *timeline.samples_mut(0).unwrap() = vec![
            DrawableSample::key(below, line(0.0)),
            DrawableSample::key(id, line(1.0)),
            DrawableSample::key(above, line(2.0)),
        ];
        *timeline.samples_mut(1).unwrap() = vec![
            DrawableSample::key(below, line(0.0)),
            DrawableSample::key(above, line(2.0)),
        ];
        *timeline.samples_mut(2).unwrap() = vec![DrawableSample::key(below, line(0.0))];

        let rebuild = run(&timeline, id, 0);
        assert_eq!(rebuild.plan.insertions[&1][0].slot, 1);
        assert_eq!(rebuild.plan.insertions[&2][0].slot, 1);
        apply(&mut timeline, rebuild);

        let order: Vec<_> = timeline.keyframe(1).unwrap().samples.iter().map(|s| s.id).collect();
        assert_eq!(order, vec![below, id, above]);
        let order: Vec<_> = timeline.keyframe(2).unwrap().samples.iter().map(|s| s.id).collect();
        assert_eq!(order, vec![below, id]);
    }

    #[test]
    fn test_takes_over_replacement_slot() {
        let id = ObjectId::new();
        let old = ObjectId::new();
        let mut timeline = timeline_with_keys(2, id, &[(0, line(1.0))]);
        timeline
            .samples_mut(1)
            .unwrap()
            .push(DrawableSample::interpolated(old, line(7.0)));

        let replacement_ids = HashSet::from([old]);
        let rebuild = rebuild(&timeline, id, &replacement_ids, 0, ScrubDirection::None).unwrap();
        assert!(rebuild.plan.insertions.is_empty());
        assert_eq!(rebuild.plan.replacements[&1][0].slot, 0);
        apply(&mut timeline, rebuild);
        assert_eq!(timeline.keyframe(1).unwrap().samples.len(), 1);
        assert_eq!(points_at(&timeline, 1, id), line(1.0));
    }

    #[test]
    fn test_extinct_object_is_removed() {
        let id = ObjectId::new();
        let mut timeline = Timeline::with_uniform_keyframes(3);
        for index in [0, 2] {
            timeline
                .samples_mut(index)
                .unwrap()
                .push(DrawableSample::interpolated(id, line(0.0)));
        }
        let rebuild = run(&timeline, id, 0);
        assert_eq!(rebuild.shape, RebuildShape::Extinct);
        assert_eq!(rebuild.plan.len(), 2);
        apply(&mut timeline, rebuild);
        assert!(timeline.keyframes().iter().all(|k| !k.holds(id)));
    }

    #[test]
    fn test_duplicates_are_reported_and_dropped() {
        let id = ObjectId::new();
        let mut timeline = timeline_with_keys(2, id, &[(0, line(1.0))]);
        let samples = timeline.samples_mut(1).unwrap();
        samples.push(DrawableSample::interpolated(id, line(1.0)));
        samples.push(DrawableSample::interpolated(id, line(5.0)));

        let rebuild = run(&timeline, id, 0);
        assert_eq!(
            rebuild.diagnostics,
            vec![Diagnostic::InconsistentSampleSet {
                keyframe: 1,
                id,
                count: 2
            }]
        );
        assert!(rebuild.plan.replacements.is_empty());
        assert_eq!(rebuild.plan.removals[&1][0].slot, 1);
    }

    #[test]
    fn test_keys_are_never_touched() {
        let id = ObjectId::new();
        let timeline = timeline_with_keys(4, id, &[(0, line(0.0)), (1, line(3.0)), (2, line(6.0))]);
        let rebuild = run(&timeline, id, 1);
        for keyframe in [0, 1, 2] {
            assert!(rebuild.plan.written(keyframe).is_none());
        }
        assert!(rebuild.plan.written(3).is_some());
    }

    #[test]
    fn test_mismatched_point_counts_are_resampled() {
        let id = ObjectId::new();
        let triangle = vec![Point::new(0.0, 10.0), Point::new(5.0, 10.0), Point::new(10.0, 10.0)];
        let timeline = timeline_with_keys(4, id, &[(0, line(0.0)), (2, triangle)]);
        let rebuild = run(&timeline, id, 0);
        let written = rebuild.plan.written(1).unwrap();
        assert_eq!(written.points.len(), 3);
        assert_relative_eq!(written.points[1].x, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_precondition_failures() {
        let id = ObjectId::new();
        let empty = Timeline::new(Vec::new(), Beat::whole(4)).unwrap();
        let err = run_err(&empty, id);
        assert!(err.is_nothing_to_interpolate());

        let zero = Timeline::new(vec![Keyframe::new(Beat::ZERO)], Beat::ZERO).unwrap();
        let err = run_err(&zero, id);
        assert_eq!(err, TimelineError::ZeroLoopLength.into());
    }

    fn run_err(timeline: &Timeline, id: ObjectId) -> crate::error::InterpError {
        rebuild(timeline, id, &HashSet::new(), 0, ScrubDirection::None).unwrap_err()
    }

    fn order(timeline: &Timeline, keyframe: usize) -> Vec<ObjectId> {
        timeline.keyframe(keyframe).unwrap().samples.iter().map(|s| s.id).collect()
    }

    #[test]
    fn test_rebuild_many_stacks_by_anchor_for_any_id_order() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let mut base = Timeline::with_uniform_keyframes(3);
        *base.samples_mut(0).unwrap() =
            vec![DrawableSample::key(a, line(0.0)), DrawableSample::key(b, line(1.0))];

        for ids in [[a, b], [b, a]] {
            let mut timeline = base.clone();
            let outcome = Interpolator::default()
                .rebuild_many(&timeline, ids, &HashSet::new(), 0, ScrubDirection::None)
                .unwrap();
            timeline.apply(&outcome.batch).unwrap();
            for index in [1, 2] {
                assert_eq!(order(&timeline, index), vec![a, b], "ids {ids:?}");
            }
        }
    }

    #[test]
    fn test_rebuild_many_takes_over_slots_of_a_rebuilt_object() {
        let x = ObjectId::new();
        let r = ObjectId::new();
        let mut timeline = timeline_with_keys(3, x, &[(0, line(2.0))]);
        for index in [1, 2] {
            timeline
                .samples_mut(index)
                .unwrap()
                .push(DrawableSample::interpolated(r, line(9.0)));
        }
        let replaceable = HashSet::from([r]);
        let interpolator = Interpolator::default();

        let outcome = interpolator
            .rebuild_many(&timeline, [x, r], &replaceable, 0, ScrubDirection::None)
            .unwrap();
        timeline.apply(&outcome.batch).unwrap();
        for index in [1, 2] {
            assert_eq!(order(&timeline, index), vec![x]);
            assert_eq!(points_at(&timeline, index, x), line(2.0));
        }

        let again = interpolator
            .rebuild_many(&timeline, [x, r], &replaceable, 0, ScrubDirection::None)
            .unwrap();
        assert!(again.batch.is_empty());
    }

    #[test]
    fn test_rebuild_many_shares_one_replacement_slot() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        let r = ObjectId::new();
        let mut base = Timeline::with_uniform_keyframes(2);
        *base.samples_mut(0).unwrap() =
            vec![DrawableSample::key(a, line(0.0)), DrawableSample::key(b, line(1.0))];
        base.samples_mut(1)
            .unwrap()
            .push(DrawableSample::interpolated(r, line(5.0)));
        let replaceable = HashSet::from([r]);
        let interpolator = Interpolator::default();

        for ids in [[a, b], [b, a]] {
            let mut timeline = base.clone();
            let outcome = interpolator
                .rebuild_many(&timeline, ids, &replaceable, 0, ScrubDirection::None)
                .unwrap();
            timeline.apply(&outcome.batch).unwrap();
            assert_eq!(order(&timeline, 1), vec![a, b], "ids {ids:?}");
            assert_eq!(points_at(&timeline, 1, a), line(0.0));
            assert_eq!(points_at(&timeline, 1, b), line(1.0));

            let again = interpolator
                .rebuild_many(&timeline, ids, &replaceable, 0, ScrubDirection::None)
                .unwrap();
            assert!(again.batch.is_empty());
        }
    }

    #[test]
    fn test_scrub_direction_extends_padding_only() {
        let interpolator = Interpolator::default();
        assert_eq!(interpolator.padding(ScrubDirection::None), (2, 2));
        assert_eq!(interpolator.padding(ScrubDirection::Forward), (2, 3));
        assert_eq!(interpolator.padding(ScrubDirection::Backward), (3, 2));

        let tight = Interpolator::new(InterpolationSettings {
            seam_padding: 0,
            ..InterpolationSettings::default()
        });
        assert_eq!(tight.padding(ScrubDirection::None), (1, 2));
        assert_eq!(tight.padding(ScrubDirection::Backward), (2, 2));

        let controls: Vec<_> = [0, 2, 4]
            .into_iter()
            .map(|t| Control {
                time: Beat::whole(t),
                value: t,
            })
            .collect();
        for (direction, first, last) in [
            (ScrubDirection::None, -4, 8),
            (ScrubDirection::Forward, -4, 10),
            (ScrubDirection::Backward, -6, 8),
        ] {
            let (before, after) = interpolator.padding(direction);
            let padded = pad_cyclic(&controls, Beat::whole(6), before, after).unwrap();
            assert_eq!(padded.len(), controls.len() + before + after);
            assert_eq!(padded[0].time, Beat::whole(first));
            assert_eq!(padded[padded.len() - 1].time, Beat::whole(last));
        }

        // Extra knots past the seam never reach the evaluated keyframes
        let id = ObjectId::new();
        let timeline = timeline_with_keys(
            6,
            id,
            &[(0, line(0.0)), (2, line(4.0)), (4, line(1.0))],
        );
        let still = interpolator
            .rebuild(&timeline, id, &HashSet::new(), 2, ScrubDirection::None)
            .unwrap();
        for direction in [ScrubDirection::Forward, ScrubDirection::Backward] {
            let moving = interpolator
                .rebuild(&timeline, id, &HashSet::new(), 2, direction)
                .unwrap();
            assert_eq!(moving.plan, still.plan, "{direction:?}");
            assert_eq!(moving.ranges, still.ranges);
        }
    }

    #[test]
    fn test_loop_ranges() {
        assert_eq!(loop_ranges(0, 4, 4), vec![0..4]);
        assert_eq!(loop_ranges(3, 4, 4), vec![3..4, 0..3]);
        assert!(loop_ranges(0, 0, 0).is_empty());
    }
}
