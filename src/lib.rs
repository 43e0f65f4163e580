pub mod audio;
pub mod config;
pub mod convert;
pub mod monitor;

pub use audio::{
    frame_level, AudioBackend, AudioFrame, CaptureConfig, CaptureStage, FileBackend, FrameRecorder,
    FrameSink, LevelMode, RecordingSummary,
};
pub use config::Config;
pub use convert::{AudioAsset, AudioDocument, ConversionError, FormatConverter, WavContainer};
pub use monitor::{
    AudioQuality, LevelMonitor, MonitorConfig, Severity, Warning, WarningCallbackId, WarningKind,
};
