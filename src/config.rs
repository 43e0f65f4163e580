use anyhow::{Context, Result};
use serde::Deserialize;

use crate::audio::CaptureConfig;
use crate::monitor::MonitorConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub monitor: MonitorConfig,
    pub capture: CaptureConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for recordings written without an explicit path
    pub recordings_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            recordings_path: "recordings".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path` (extension optional). Missing files and
    /// missing keys fall back to defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()
            .with_context(|| format!("Failed to read config from {}", path))?;

        settings
            .try_deserialize()
            .with_context(|| format!("Invalid config in {}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = Config::load("/nonexistent/audio-intake").unwrap();
        assert_eq!(cfg.monitor, MonitorConfig::default());
        assert_eq!(cfg.capture, CaptureConfig::default());
        assert_eq!(cfg.output.recordings_path, "recordings");
    }

    #[test]
    fn partial_file_overrides_only_given_keys() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[monitor]\nclipping_threshold = 0.8\ncheck_interval_ms = 250").unwrap();
        writeln!(file, "[capture]\nlevel_mode = \"rms\"").unwrap();

        let cfg = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.monitor.clipping_threshold, 0.8);
        assert_eq!(cfg.monitor.check_interval_ms, 250);
        assert_eq!(cfg.monitor.no_audio_duration_ms, 5000);
        assert_eq!(cfg.capture.level_mode, crate::audio::LevelMode::Rms);
        assert_eq!(cfg.capture.quantum_size, 128);
    }
}
