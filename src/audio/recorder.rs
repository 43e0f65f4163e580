use anyhow::{bail, Context, Result};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::capture::AudioFrame;
use super::level::{frame_level, LevelMode};
use crate::convert::{encode_wav, AudioDocument, WavContainer};
use crate::monitor::LevelMonitor;

/// Summary of a finished recording
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSummary {
    /// Frames received from the capture stage
    pub frames_received: usize,
    /// Total samples across all frames
    pub sample_count: usize,
    /// Sample rate the recording was captured at
    pub sample_rate: u32,
    /// Duration in seconds
    pub duration_secs: f64,
}

/// Consumer side of the capture channel
///
/// Drains frames posted by a capture stage, feeds a level sample per frame
/// into an optional [`LevelMonitor`] and accumulates the samples into a mono
/// recording.
pub struct FrameRecorder {
    sample_rate: u32,
    level_mode: LevelMode,
    monitor: Option<LevelMonitor>,
    samples: Vec<f32>,
    frames_received: usize,
}

impl FrameRecorder {
    pub fn new(sample_rate: u32, level_mode: LevelMode) -> Self {
        Self {
            sample_rate,
            level_mode,
            monitor: None,
            samples: Vec::new(),
            frames_received: 0,
        }
    }

    /// Report one level sample per received frame to `monitor`.
    pub fn with_monitor(mut self, monitor: LevelMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Handle a single frame.
    pub fn push_frame(&mut self, frame: AudioFrame) {
        if let Some(monitor) = &self.monitor {
            monitor.update_audio_level(frame_level(&frame.samples, self.level_mode));
        }

        self.frames_received += 1;
        self.samples.extend_from_slice(&frame.samples);
    }

    /// Consume frames until the sending side closes.
    pub async fn record(&mut self, mut audio_rx: mpsc::UnboundedReceiver<AudioFrame>) -> RecordingSummary {
        info!("Starting recording at {}Hz", self.sample_rate);

        while let Some(frame) = audio_rx.recv().await {
            self.push_frame(frame);

            if self.frames_received % 1000 == 0 {
                debug!(
                    "Recorded {} frames ({:.1}s)",
                    self.frames_received,
                    self.duration_secs()
                );
            }
        }

        let summary = self.summary();
        info!(
            "Recording complete: {} frames, {} samples, {:.1}s",
            summary.frames_received, summary.sample_count, summary.duration_secs
        );

        summary
    }

    pub fn summary(&self) -> RecordingSummary {
        RecordingSummary {
            frames_received: self.frames_received,
            sample_count: self.samples.len(),
            sample_rate: self.sample_rate,
            duration_secs: self.duration_secs(),
        }
    }

    fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// The recording so far as a mono document.
    pub fn to_document(&self) -> AudioDocument {
        AudioDocument::mono(self.sample_rate, self.samples.clone())
    }

    /// Finish and hand over the recording as a mono document.
    pub fn into_document(self) -> AudioDocument {
        AudioDocument::mono(self.sample_rate, self.samples)
    }

    /// Encode the recording so far as a WAV container.
    pub fn to_wav(&self) -> Result<WavContainer> {
        if self.sample_rate == 0 {
            bail!("Cannot encode a recording without a sample rate");
        }
        encode_wav(&self.to_document()).context("Failed to encode recording")
    }

    /// Encode the recording and write it to `path`.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<WavContainer> {
        let wav = self.to_wav()?;
        wav.write_to(path).await?;
        Ok(wav)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_frame_accumulates_samples() {
        let mut recorder = FrameRecorder::new(16_000, LevelMode::Peak);
        recorder.push_frame(AudioFrame { samples: vec![0.1; 128] });
        recorder.push_frame(AudioFrame { samples: vec![0.2; 64] });

        let summary = recorder.summary();
        assert_eq!(summary.frames_received, 2);
        assert_eq!(summary.sample_count, 192);
        assert_eq!(recorder.to_document().frame_count(), 192);
    }

    #[test]
    fn push_frame_feeds_monitor() {
        let monitor = LevelMonitor::default();
        let mut recorder = FrameRecorder::new(16_000, LevelMode::Peak).with_monitor(monitor.clone());

        for _ in 0..3 {
            recorder.push_frame(AudioFrame { samples: vec![0.5; 128] });
        }

        assert_eq!(monitor.window_len(), 3);
    }

    #[test]
    fn zero_sample_rate_cannot_be_encoded() {
        let recorder = FrameRecorder::new(0, LevelMode::Peak);
        assert!(recorder.to_wav().is_err());
    }
}
