// SPDX-License-Identifier: MIT OR Apache-2.0
//! Evaluator settings, stored as RON next to the project.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "texture_graph.ron";

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed RON
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Written by a newer version
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest version this build reads
        supported: u32,
    },
}

/// Result type for settings operations
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Tunables for graph evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorSettings {
    /// Format version
    pub version: u32,
    /// Honor the Memoized strategy; when off every node recomputes each pass
    pub memoization: bool,
    /// Emit an info-level summary after each pass
    pub log_pass_summary: bool,
    /// Give never-computed outputs of a failed node the zero value of their type
    pub zero_fill_failed_outputs: bool,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            memoization: true,
            log_pass_summary: true,
            zero_fill_failed_outputs: true,
        }
    }
}

impl EvaluatorSettings {
    /// Parse settings from a RON string
    pub fn from_ron(content: &str) -> Result<Self> {
        let settings: EvaluatorSettings = ron::from_str(content)?;

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

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}
