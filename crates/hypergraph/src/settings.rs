// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph view settings, stored as RON.

use crate::geometry::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Reading or writing the file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid RON for these settings
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Written by a newer format
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },
}

/// Result type for settings operations
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Appearance and input settings of a graph view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Format version
    pub version: u32,
    /// Draw the background grid
    pub show_grid: bool,
    /// Small grid step in graph units
    pub small_grid_step: f32,
    /// Large grid step in graph units
    pub large_grid_step: f32,
    /// Draw connection labels
    pub show_labels: bool,
    /// Mark compatible connectors while dragging a connection
    pub highlight_compatible: bool,
    /// Smallest zoom
    pub min_zoom: f32,
    /// Largest zoom
    pub max_zoom: f32,
    /// Wheel delta that doubles the zoom
    pub wheel_zoom_divisor: f32,
    /// Vertical drag distance that doubles the zoom in scale mode
    pub drag_zoom_divisor: f32,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            show_grid: true,
            small_grid_step: 16.0,
            large_grid_step: 128.0,
            show_labels: false,
            highlight_compatible: true,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            wheel_zoom_divisor: 480.0,
            drag_zoom_divisor: 100.0,
        }
    }
}

impl GraphSettings {
    /// Parse settings from RON; missing fields take their defaults.
    pub fn from_ron(s: &str) -> Result<Self> {
        let settings: Self = ron::from_str(s)?;
        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }
        Ok(settings)
    }

    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Load settings from a file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(SettingsError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "failed to load graph settings, using defaults");
                Self::default()
            }
        }
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// Zoom limits in ascending order.
    pub fn zoom_limits(&self) -> (f32, f32) {
        (self.min_zoom.min(self.max_zoom), self.max_zoom.max(self.min_zoom))
    }
}
