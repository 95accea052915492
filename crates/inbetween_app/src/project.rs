// SPDX-License-Identifier: MIT OR Apache-2.0
//! Project files and settings.
//!
//! A project is a single RON document holding:
//! - The format version
//! - Interpolation and history settings
//! - The timeline itself

use crate::history::MAX_HISTORY;
use inbetween_engine::InterpolationSettings;
use inbetween_timeline::Timeline;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// Current project file format version
pub const PROJECT_FORMAT_VERSION: u32 = 1;

/// Settings stored with a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    /// Curve construction tunables
    pub interpolation: InterpolationSettings,
    /// Undo groups kept in memory
    pub history_depth: usize,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            interpolation: InterpolationSettings::default(),
            history_depth: MAX_HISTORY,
        }
    }
}

/// A complete project document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// File format version
    pub version: u32,
    /// Project settings
    #[serde(default)]
    pub settings: ProjectSettings,
    /// The animated timeline
    pub timeline: Timeline,
}

impl ProjectFile {
    /// Create a project around a timeline with default settings
    pub fn new(timeline: Timeline) -> Self {
        Self {
            version: PROJECT_FORMAT_VERSION,
            settings: ProjectSettings::default(),
            timeline,
        }
    }

    /// Parse a project from RON text
    pub fn from_ron(content: &str) -> io::Result<Self> {
        let project: ProjectFile = ron::from_str(content)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        if project.version > PROJECT_FORMAT_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Project version {} is newer than supported version {}",
                    project.version, PROJECT_FORMAT_VERSION
                ),
            ));
        }

        // Deserialization bypasses the timeline constructor
        project
            .timeline
            .validate()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        Ok(project)
    }

    /// Render the project as pretty RON
    pub fn to_ron(&self) -> io::Result<String> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);

        ron::ser::to_string_pretty(self, config)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Load a project file
    pub fn load(path: &Path) -> io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let project = Self::from_ron(&content)?;
        tracing::info!(
            path = %path.display(),
            keyframes = project.timeline.keyframe_count(),
            "Loaded project"
        );
        Ok(project)
    }

    /// Save the project file
    pub fn save(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.to_ron()?)?;
        tracing::info!(path = %path.display(), "Saved project");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inbetween_timeline::{Beat, DrawableSample, Keyframe, ObjectId, Point};

    fn project() -> ProjectFile {
        let id = ObjectId::new();
        let keyframes = vec![
            Keyframe::new(Beat::ZERO)
                .with_sample(DrawableSample::key(id, vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)])),
            Keyframe::new(Beat::new(3, 2).unwrap()),
        ];
        ProjectFile::new(Timeline::new(keyframes, Beat::whole(3)).unwrap())
    }

    #[test]
    fn test_default_settings() {
        let settings = ProjectSettings::default();
        assert_eq!(settings.history_depth, MAX_HISTORY);
        assert_eq!(settings.interpolation, InterpolationSettings::default());
    }

    #[test]
    fn test_ron_roundtrip() {
        let project = project();
        let text = project.to_ron().unwrap();
        assert!(text.contains("\"3/2\""));
        assert_eq!(ProjectFile::from_ron(&text).unwrap(), project);
    }

    #[test]
    fn test_missing_settings_use_defaults() {
        let mut text = project().to_ron().unwrap();
        let start = text.find("settings:").unwrap();
        let end = text.find("timeline:").unwrap();
        text.replace_range(start..end, "");
        let loaded = ProjectFile::from_ron(&text).unwrap();
        assert_eq!(loaded.settings, ProjectSettings::default());
    }

    #[test]
    fn test_rejects_newer_version() {
        let mut project = project();
        project.version = PROJECT_FORMAT_VERSION + 1;
        let text = project.to_ron().unwrap();
        let err = ProjectFile::from_ron(&text).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_rejects_unordered_timeline() {
        let text = project().to_ron().unwrap().replace("\"3/2\"", "\"7/2\"");
        let err = ProjectFile::from_ron(&text).unwrap_err();
        assert!(err.to_string().contains("exceeds loop length"));
    }
}
