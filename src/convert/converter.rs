use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use symphonia::core::codecs::{CodecType, CODEC_TYPE_PCM_S16LE};
use tracing::{debug, info};

use super::document::{AudioAsset, AudioDocument, DecodeContext};
use super::error::ConversionError;
use super::wav::{encode_wav, WavContainer};

/// Transcodes audio assets into canonical 16-bit PCM WAV.
///
/// The decode context is created on first use, released by [`dispose`](Self::dispose)
/// and recreated transparently by the next conversion. Conversions in flight
/// hold their own reference to the context, so disposing never tears it down
/// underneath them.
pub struct FormatConverter {
    context: Mutex<Option<Arc<DecodeContext>>>,
}

impl FormatConverter {
    pub fn new() -> Self {
        Self {
            context: Mutex::new(None),
        }
    }

    /// Whether this build can decode and encode audio at all.
    ///
    /// Callers in constrained builds should check this before converting.
    pub fn is_supported() -> bool {
        const REQUIRED: CodecType = CODEC_TYPE_PCM_S16LE;
        symphonia::default::get_codecs().get_codec(REQUIRED).is_some()
    }

    /// Decode `asset` and re-encode it as a WAV container.
    ///
    /// Sample rate and channel count come from the decoded stream. Any decode
    /// failure is returned as a [`ConversionError`] carrying the decoder's message.
    pub async fn convert_to_wav(&self, asset: AudioAsset) -> Result<WavContainer, ConversionError> {
        let context = self.acquire();
        let input_bytes = asset.len();
        let started = Instant::now();

        info!("Converting audio asset to WAV ({} bytes)", input_bytes);

        let wav = tokio::task::spawn_blocking(move || {
            let document = context.decode(asset)?;
            encode_wav(&document)
        })
        .await??;

        info!(
            "Conversion complete: {} frames, {} Hz, {} channels, {} bytes in {:?}",
            wav.frame_count(),
            wav.sample_rate(),
            wav.channels(),
            wav.len(),
            started.elapsed()
        );

        Ok(wav)
    }

    /// Decode without encoding, e.g. to replay an asset through the capture path.
    pub async fn decode(&self, asset: AudioAsset) -> Result<AudioDocument, ConversionError> {
        let context = self.acquire();
        let document = tokio::task::spawn_blocking(move || context.decode(asset)).await??;
        Ok(document)
    }

    /// Release the decode context. Safe to call repeatedly.
    pub fn dispose(&self) {
        if self.lock().take().is_some() {
            debug!("Decode context released");
        }
    }

    /// Whether a decode context is currently held.
    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    fn acquire(&self) -> Arc<DecodeContext> {
        let mut slot = self.lock();
        let context = slot.get_or_insert_with(|| {
            debug!("Creating decode context");
            Arc::new(DecodeContext::new())
        });
        Arc::clone(context)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<DecodeContext>>> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FormatConverter {
    fn default() -> Self {
        Self::new()
    }
}
