// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editing session: the authoritative timeline plus its undo history.
//!
//! This is the undo/commit side of interpolation. Commands plan batches, the session applies
//! them and records one history action per user command group. A batch that changes nothing is never
//! recorded.

use crate::commands::{CommandError, EditorCommand};
use crate::history::{History, KeyframeChange, SampleSnapshot};
use crate::project::{ProjectFile, ProjectSettings};
use inbetween_engine::Diagnostic;
use inbetween_timeline::{Timeline, TimelineError};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// What executing a user action did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommandOutcome {
    /// History group description
    pub description: String,
    /// Number of applied edits
    pub edits: usize,
    /// Keyframes whose sample lists changed
    pub keyframes: Vec<usize>,
    /// Diagnostics reported while planning
    pub diagnostics: Vec<Diagnostic>,
    /// An undo group was recorded
    pub committed: bool,
}

/// The live editing state of one project
#[derive(Debug)]
pub struct Session {
    /// Authoritative timeline
    timeline: Timeline,
    /// Project settings
    settings: ProjectSettings,
    /// Undo/redo history
    history: History,
    /// Unsaved changes exist
    dirty: bool,
}

impl Session {
    /// Open a session on a loaded project
    pub fn new(project: ProjectFile) -> Self {
        let history = History::with_max_depth(project.settings.history_depth);
        Self {
            timeline: project.timeline,
            settings: project.settings,
            history,
            dirty: false,
        }
    }

    /// The timeline
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Project settings
    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    /// Undo history
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Unsaved changes exist
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Execute one command as its own undo group
    pub fn execute(&mut self, command: &dyn EditorCommand) -> Result<CommandOutcome, CommandError> {
        self.execute_all(&command.description(), &[command])
    }

    /// Execute commands in order as a single undo group.
    ///
    /// Each command plans against the timeline left by the previous one. If any command fails,
    /// everything this call applied is rolled back.
    pub fn execute_all(
        &mut self,
        description: &str,
        commands: &[&dyn EditorCommand],
    ) -> Result<CommandOutcome, CommandError> {
        let mut before = BTreeMap::new();
        let mut outcome = CommandOutcome {
            description: description.to_string(),
            ..Default::default()
        };

        if let Err(err) = self.apply_commands(commands, &mut before, &mut outcome) {
            tracing::warn!(description, error = %err, "Rolling back failed action");
            self.restore(before.iter().map(|(&index, snapshot)| (index, snapshot)))?;
            return Err(err);
        }
        if before.is_empty() {
            tracing::debug!(description, "Nothing changed");
            return Ok(outcome);
        }

        let mut changes = Vec::with_capacity(before.len());
        for (index, snapshot) in before {
            let samples = self
                .timeline
                .keyframe(index)
                .map(|k| k.samples.as_slice())
                .unwrap_or_default();
            let after = SampleSnapshot::capture(samples)?;
            changes.push(KeyframeChange::new(index, snapshot, after));
            outcome.keyframes.push(index);
        }
        self.history.record(description, changes);
        self.dirty = true;
        outcome.committed = true;

        tracing::info!(
            description,
            edits = outcome.edits,
            keyframes = outcome.keyframes.len(),
            "Committed action"
        );
        Ok(outcome)
    }

    fn apply_commands(
        &mut self,
        commands: &[&dyn EditorCommand],
        before: &mut BTreeMap<usize, SampleSnapshot>,
        outcome: &mut CommandOutcome,
    ) -> Result<(), CommandError> {
        for command in commands {
            let planned = command.plan(&self.timeline, &self.settings.interpolation)?;
            for diagnostic in &planned.diagnostics {
                tracing::warn!(%diagnostic, "Inconsistent timeline data");
            }
            outcome.diagnostics.extend(planned.diagnostics);
            if planned.batch.is_empty() {
                continue;
            }

            for index in planned.batch.keyframes() {
                if let Entry::Vacant(entry) = before.entry(index) {
                    let Some(keyframe) = self.timeline.keyframe(index) else {
                        return Err(TimelineError::KeyframeOutOfRange {
                            index,
                            count: self.timeline.keyframe_count(),
                        }
                        .into());
                    };
                    entry.insert(SampleSnapshot::capture(&keyframe.samples)?);
                }
            }
            self.timeline.apply(&planned.batch)?;
            outcome.edits += planned.batch.len();
        }
        Ok(())
    }

    fn restore<'a>(
        &mut self,
        snapshots: impl IntoIterator<Item = (usize, &'a SampleSnapshot)>,
    ) -> Result<(), CommandError> {
        let mut lists = Vec::new();
        for (index, snapshot) in snapshots {
            lists.push((index, snapshot.restore()?));
        }
        self.timeline.replace_samples(lists)?;
        Ok(())
    }

    /// Undo the last action and return its description
    pub fn undo(&mut self) -> Result<String, CommandError> {
        let record = self.history.undo()?;
        self.restore(record.changes.iter().map(|c| (c.keyframe, &c.before)))?;
        self.dirty = true;
        tracing::info!(description = %record.description, "Undo");
        Ok(record.description)
    }

    /// Redo the last undone action and return its description
    pub fn redo(&mut self) -> Result<String, CommandError> {
        let record = self.history.redo()?;
        self.restore(record.changes.iter().map(|c| (c.keyframe, &c.after)))?;
        self.dirty = true;
        tracing::info!(description = %record.description, "Redo");
        Ok(record.description)
    }

    /// Current state as a project document
    pub fn to_project(&self) -> ProjectFile {
        ProjectFile {
            settings: self.settings.clone(),
            ..ProjectFile::new(self.timeline.clone())
        }
    }

    /// Record that the current state was saved
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{InterpolateCommand, RetypeCommand};
    use approx::assert_relative_eq;
    use inbetween_timeline::{DrawableSample, ObjectId, Point, SampleKind};

    fn line(y: f64) -> Vec<Point> {
        vec![Point::new(0.0, y), Point::new(10.0, y)]
    }

    fn session(id: ObjectId) -> Session {
        let mut timeline = Timeline::with_uniform_keyframes(4);
        timeline
            .samples_mut(0)
            .unwrap()
            .push(DrawableSample::key(id, line(0.0)));
        timeline
            .samples_mut(2)
            .unwrap()
            .push(DrawableSample::key(id, line(10.0)));
        Session::new(ProjectFile::new(timeline))
    }

    #[test]
    fn test_interpolate_commits_one_group() {
        let id = ObjectId::new();
        let mut session = session(id);
        let outcome = session.execute(&InterpolateCommand::new(vec![id])).unwrap();
        assert!(outcome.committed);
        assert_eq!(outcome.keyframes, vec![1, 3]);
        assert_eq!(session.history().stats().undo_count, 1);
        assert!(session.is_dirty());

        let midpoint = &session.timeline().keyframe(3).unwrap().sample(id).unwrap().points;
        assert_relative_eq!(midpoint[0].y, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unchanged_rebuild_opens_no_group() {
        let id = ObjectId::new();
        let mut session = session(id);
        session.execute(&InterpolateCommand::new(vec![id])).unwrap();
        let again = session.execute(&InterpolateCommand::new(vec![id])).unwrap();
        assert!(!again.committed);
        assert_eq!(again.edits, 0);
        assert_eq!(session.history().stats().undo_count, 1);
    }

    #[test]
    fn test_undo_and_redo_restore_samples() {
        let id = ObjectId::new();
        let mut session = session(id);
        let original = session.timeline().clone();
        session.execute(&InterpolateCommand::new(vec![id])).unwrap();
        let interpolated = session.timeline().clone();

        let description = session.undo().unwrap();
        assert_eq!(description, format!("Interpolate {id}"));
        assert_eq!(session.timeline(), &original);

        session.redo().unwrap();
        assert_eq!(session.timeline(), &interpolated);
        assert!(matches!(session.redo(), Err(CommandError::History(_))));
    }

    #[test]
    fn test_retype_then_rebuild_is_one_action() {
        let id = ObjectId::new();
        let mut session = session(id);
        session.execute(&InterpolateCommand::new(vec![id])).unwrap();

        // Demote the key at keyframe 2; the object becomes constant
        let retype = RetypeCommand::new(2, id, SampleKind::Interpolated);
        let rebuild = InterpolateCommand::new(vec![id]);
        let outcome = session
            .execute_all("Demote key", &[&retype as &dyn EditorCommand, &rebuild])
            .unwrap();
        assert!(outcome.committed);
        for keyframe in session.timeline().keyframes() {
            assert_eq!(keyframe.sample(id).unwrap().points, line(0.0));
        }

        session.undo().unwrap();
        assert!(session.timeline().keyframe(2).unwrap().sample(id).unwrap().is_key());
        assert_eq!(session.history().undo_description(), Some(format!("Interpolate {id}").as_str()));
    }

    #[test]
    fn test_failed_action_rolls_back() {
        let id = ObjectId::new();
        let mut session = session(id);
        let original = session.timeline().clone();

        let rebuild = InterpolateCommand::new(vec![id]);
        let missing = RetypeCommand::new(1, ObjectId::new(), SampleKind::Key);
        let commands: [&dyn EditorCommand; 2] = [&rebuild, &missing];
        let err = session.execute_all("Broken", &commands);
        assert!(matches!(err, Err(CommandError::SampleNotFound { .. })));
        assert_eq!(session.timeline(), &original);
        assert!(!session.history().can_undo());
    }

    #[test]
    fn test_to_project_keeps_settings() {
        let id = ObjectId::new();
        let mut session = session(id);
        session.settings.history_depth = 7;
        session.execute(&InterpolateCommand::new(vec![id])).unwrap();
        session.mark_saved();
        assert!(!session.is_dirty());

        let project = session.to_project();
        assert_eq!(project.settings.history_depth, 7);
        assert_eq!(&project.timeline, session.timeline());
    }
}
