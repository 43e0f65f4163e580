use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signal problem detected by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    NoAudio,
    LowAudio,
    Clipping,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::NoAudio => "no_audio",
            WarningKind::LowAudio => "low_audio",
            WarningKind::Clipping => "clipping",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            WarningKind::NoAudio => Severity::Error,
            WarningKind::LowAudio | WarningKind::Clipping => Severity::Warning,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            WarningKind::NoAudio => "No audio detected. Check that the microphone is connected and not muted.",
            WarningKind::LowAudio => "Audio level is low. Speak louder or move closer to the microphone.",
            WarningKind::Clipping => "Audio is clipping. Lower the input gain or move away from the microphone.",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single emitted warning. Immutable once handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    #[serde(rename = "type")]
    pub kind: WarningKind,

    pub message: String,

    pub severity: Severity,

    /// When the warning was raised
    pub timestamp: DateTime<Utc>,
}

impl Warning {
    pub fn new(kind: WarningKind) -> Self {
        Self {
            kind,
            message: kind.message().to_string(),
            severity: kind.severity(),
            timestamp: Utc::now(),
        }
    }
}

/// Overall verdict on the recent signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioQuality {
    Excellent,
    Good,
    Fair,
    Poor,
    /// No recent signal at all
    #[serde(rename = "none")]
    NoSignal,
}

impl AudioQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioQuality::Excellent => "excellent",
            AudioQuality::Good => "good",
            AudioQuality::Fair => "fair",
            AudioQuality::Poor => "poor",
            AudioQuality::NoSignal => "none",
        }
    }
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
