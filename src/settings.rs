use crate::playback::{
    PlaybackConfig, DEFAULT_PACING_SCALE_FACTOR, DEFAULT_START_BARRIER_GRACE, DEFAULT_WORKER_COUNT,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Persistent playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub worker_count: usize,
    pub pacing_scale_factor: u32,
    pub start_barrier_grace_ms: u64,
    pub return_on_completion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            pacing_scale_factor: DEFAULT_PACING_SCALE_FACTOR,
            start_barrier_grace_ms: DEFAULT_START_BARRIER_GRACE.as_millis() as u64,
            return_on_completion: false,
        }
    }
}

impl Settings {
    /// Default settings file location
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("worker-replay").join("settings.json"))
    }

    /// Load settings from `path`, or defaults if the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            worker_count: self.worker_count,
            pacing_scale_factor: self.pacing_scale_factor,
            start_barrier_grace: Duration::from_millis(self.start_barrier_grace_ms),
            return_on_completion: self.return_on_completion,
        }
    }
}
