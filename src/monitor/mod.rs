//! Signal-quality monitoring
//!
//! This module provides the `LevelMonitor` that:
//! - Keeps a short rolling window of level samples
//! - Periodically classifies silence, low level and clipping
//! - Emits deduplicated warnings to registered observers
//! - Reports an overall quality verdict

mod config;
#[allow(clippy::module_inception)]
mod monitor;
mod warning;

pub use config::MonitorConfig;
pub use monitor::{
    LevelMonitor, WarningCallback, WarningCallbackId, DEDUP_WINDOW, DEFAULT_RECENT_WARNINGS,
    MAX_WARNING_HISTORY, WINDOW_CAPACITY,
};
pub use warning::{AudioQuality, Severity, Warning, WarningKind};
