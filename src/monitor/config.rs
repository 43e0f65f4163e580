use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Thresholds and timing for a [`LevelMonitor`](super::LevelMonitor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Levels at or below this count as silence
    pub no_audio_threshold: f32,

    /// How long silence may last before a `no_audio` warning, in milliseconds
    pub no_audio_duration_ms: u64,

    /// Average levels below this (but above silence) are reported as low
    pub low_audio_threshold: f32,

    /// Peak levels above this are reported as clipping
    pub clipping_threshold: f32,

    /// Period of the signal check, in milliseconds
    pub check_interval_ms: u64,
}

impl MonitorConfig {
    pub fn no_audio_duration(&self) -> Duration {
        Duration::from_millis(self.no_audio_duration_ms)
    }

    /// Check period, never shorter than one millisecond.
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms.max(1))
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            no_audio_threshold: 0.01,
            no_audio_duration_ms: 5000,
            low_audio_threshold: 0.1,
            clipping_threshold: 0.95,
            check_interval_ms: 1000,
        }
    }
}
