use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use super::capture::{AudioFrame, CaptureStage, DEFAULT_QUANTUM_SIZE};
use super::level::LevelMode;
use crate::convert::AudioDocument;

/// Configuration for the capture path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Samples per render quantum
    pub quantum_size: usize,
    /// How frames are reduced to level samples for the monitor
    pub level_mode: LevelMode,
    /// Pace replayed quanta at the host clock instead of as fast as possible
    pub realtime: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            quantum_size: DEFAULT_QUANTUM_SIZE,
            level_mode: LevelMode::Peak,
            realtime: false,
        }
    }
}

/// Audio capture backend trait
///
/// A backend owns the render host: it drives a [`CaptureStage`] once per
/// quantum and hands the consumer the receiving end of the frame channel.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames. The channel
    /// closes when the source is exhausted or the backend is stopped.
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Sample rate of the frames this backend produces
    fn sample_rate(&self) -> u32;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Replays the first channel of a decoded document as if it were a live input.
pub struct FileBackend {
    document: Arc<AudioDocument>,
    config: CaptureConfig,
    render_task: Option<JoinHandle<u64>>,
}

impl FileBackend {
    pub fn new(document: AudioDocument, config: CaptureConfig) -> Result<Self> {
        if config.quantum_size == 0 {
            bail!("Quantum size must be at least one sample");
        }
        if config.realtime && document.sample_rate() == 0 {
            bail!("Cannot pace playback of a document with a zero sample rate");
        }

        info!(
            "File backend initialized ({}Hz, {} frames, quantum {})",
            document.sample_rate(),
            document.frame_count(),
            config.quantum_size
        );

        Ok(Self {
            document: Arc::new(document),
            config,
            render_task: None,
        })
    }

    fn quantum_duration(&self) -> Duration {
        Duration::from_secs_f64(self.config.quantum_size as f64 / self.document.sample_rate() as f64)
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<AudioFrame>> {
        if self.is_capturing() {
            bail!("Already capturing");
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let document = Arc::clone(&self.document);
        let quantum_size = self.config.quantum_size;
        let pacing = self.config.realtime.then(|| self.quantum_duration());

        info!(
            "Starting file playback ({})",
            if pacing.is_some() { "realtime" } else { "unpaced" }
        );

        let task = tokio::spawn(async move {
            let stage = CaptureStage::new(tx);
            let samples = document.channel(0).unwrap_or_default();

            let mut ticker = pacing.map(|period| {
                let mut ticker = time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
                ticker
            });

            for block in samples.chunks(quantum_size) {
                if let Some(ticker) = ticker.as_mut() {
                    ticker.tick().await;
                } else {
                    tokio::task::yield_now().await;
                }

                let inputs = [[block]];
                stage.process(&inputs);
            }

            stage.frames_posted()
        });

        self.render_task = Some(task);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(task) = self.render_task.take() else {
            return Ok(());
        };

        info!("Stopping file playback");

        task.abort();
        match task.await {
            Ok(frames) => info!("File playback finished ({} frames)", frames),
            Err(e) if e.is_cancelled() => info!("File playback stopped"),
            Err(e) => warn!("File playback task failed: {}", e),
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.render_task
            .as_ref()
            .map_or(false, |task| !task.is_finished())
    }

    fn sample_rate(&self) -> u32 {
        self.document.sample_rate()
    }

    fn name(&self) -> &str {
        "File playback"
    }
}
