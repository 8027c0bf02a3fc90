//! Session and engine configuration

use crate::recorder::channel::{RecordingError, RecordingResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TYPING_GAP_SECS: f64 = 5.0;
pub const DEFAULT_WATCHDOG_INTERVAL_MS: u64 = 500;
pub const DEFAULT_FPS: u32 = 30;

/// Configuration for a recording session, as read from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Directory receiving the video, the action log and screenshots
    pub output_dir: PathBuf,
    pub fps: u32,
    /// Burn a running timer into the recorded video
    pub timer_overlay: bool,
    /// Debug mode: grab a still frame at the start and end of every action
    pub capture_screenshots: bool,
    /// Inactivity (seconds) that closes a typing phrase
    pub typing_gap_secs: f64,
    pub watchdog_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("recordings"),
            fps: DEFAULT_FPS,
            timer_overlay: false,
            capture_screenshots: false,
            typing_gap_secs: DEFAULT_TYPING_GAP_SECS,
            watchdog_interval_ms: DEFAULT_WATCHDOG_INTERVAL_MS,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> RecordingResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RecordingResult<()> {
        if self.fps == 0 {
            return Err(RecordingError::ConfigurationError(
                "fps must be greater than zero".to_string(),
            ));
        }
        if !(self.typing_gap_secs.is_finite() && self.typing_gap_secs > 0.0) {
            return Err(RecordingError::ConfigurationError(format!(
                "typingGapSecs must be positive, got {}",
                self.typing_gap_secs
            )));
        }
        if self.watchdog_interval_ms == 0 {
            return Err(RecordingError::ConfigurationError(
                "watchdogIntervalMs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            typing_gap: Duration::from_secs_f64(self.typing_gap_secs),
            watchdog_interval: Duration::from_millis(self.watchdog_interval_ms),
            capture_enabled: self.capture_screenshots,
        }
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.output_dir.join("screenshots")
    }
}

/// Tunables of the action engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub typing_gap: Duration,
    pub watchdog_interval: Duration,
    pub capture_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        SessionConfig::default().engine()
    }
}
