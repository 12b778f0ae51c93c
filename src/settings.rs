//! Application settings
//!
//! Stored as `settings.json` in the data directory. Every field has a
//! default, so a missing file or missing keys are fine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recall::{LadderError, StopLadder, DEFAULT_STOP_LADDER};
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid stop ladder: {0}")]
    Ladder(#[from] LadderError),
}

impl From<std::io::Error> for SettingsError {
    fn from(error: std::io::Error) -> Self {
        SettingsError::Storage(StorageError::Io(error))
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(error: serde_json::Error) -> Self {
        SettingsError::Storage(StorageError::Json(error))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Comma-separated recall intervals
    #[serde(default = "default_stop_ladder")]
    pub stop_ladder: String,
    /// Content sheet whose recall progress is active
    #[serde(default = "default_sheet")]
    pub current_sheet: String,
    /// How often cached recall states are re-evaluated
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

fn default_stop_ladder() -> String {
    DEFAULT_STOP_LADDER.to_string()
}

fn default_sheet() -> String {
    "default".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stop_ladder: default_stop_ladder(),
            current_sheet: default_sheet(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl Settings {
    /// Path to settings.json inside a data directory
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join("settings.json")
    }

    /// Load settings, using defaults when the file does not exist
    pub fn load(data_dir: &Path) -> Result<Self, SettingsError> {
        let path = Self::path(data_dir);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        settings.ladder()?;
        Ok(settings)
    }

    pub fn save(&self, data_dir: &Path) -> Result<(), SettingsError> {
        fs::create_dir_all(data_dir)?;
        fs::write(Self::path(data_dir), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Parse the configured stop ladder
    pub fn ladder(&self) -> Result<StopLadder, LadderError> {
        StopLadder::parse(&self.stop_ladder)
    }

    /// Refresh period, never shorter than one second
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}
