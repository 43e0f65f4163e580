//! Canonical 16-bit PCM WAV encoding.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! [0-3]    "RIFF"
//! [4-7]    file size - 8 (36 + data_size)
//! [8-11]   "WAVE"
//! [12-15]  "fmt "
//! [16-19]  16 (PCM format chunk size)
//! [20-21]  1 (PCM format code)
//! [22-23]  channels
//! [24-27]  sample_rate
//! [28-31]  byte_rate = sample_rate * channels * 2
//! [32-33]  block_align = channels * 2
//! [34-35]  16 (bits per sample)
//! [36-39]  "data"
//! [40-43]  data_size = frames * channels * 2
//! [44..]   interleaved i16 samples, frame by frame
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::document::AudioDocument;
use super::error::ConversionError;

/// Size of the canonical WAV header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: u64 = 2;

/// Encoded WAV bytes plus the parameters they were written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavContainer {
    bytes: Vec<u8>,
    sample_rate: u32,
    channels: u16,
    frame_count: usize,
}

impl WavContainer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// The PCM payload following the header.
    pub fn data(&self) -> &[u8] {
        &self.bytes[WAV_HEADER_SIZE..]
    }

    /// Write the container to `path`, replacing any existing file.
    pub async fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        tokio::fs::write(path, &self.bytes)
            .await
            .with_context(|| format!("Failed to write WAV file: {}", path.display()))?;

        info!(
            "Wrote WAV file {} ({} bytes, {} Hz, {} channels)",
            path.display(),
            self.bytes.len(),
            self.sample_rate,
            self.channels
        );

        Ok(())
    }
}

/// Build the 44-byte header for a 16-bit PCM payload of `data_size` bytes.
pub fn wav_header(sample_rate: u32, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let block_align = channels.wrapping_mul(BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate.wrapping_mul(u32::from(block_align));
    let chunk_size = 36u32.wrapping_add(data_size);

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Convert a float sample to 16-bit PCM.
///
/// The sample is clamped to [-1.0, 1.0]; negatives scale by 32768 and
/// positives by 32767 so both ends of the range are reachable without
/// overflow. The scaled value is truncated toward zero.
pub fn sample_to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s <= 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode a decoded document as a canonical 16-bit PCM WAV container.
pub fn encode_wav(document: &AudioDocument) -> Result<WavContainer, ConversionError> {
    let channel_count = document.channel_count();
    let frame_count = document.frame_count();

    let channels = u16::try_from(channel_count).map_err(|_| {
        ConversionError::InvalidDocument(format!("{} channels exceed WAV limit", channel_count))
    })?;

    let data_bytes = frame_count as u64 * channel_count as u64 * BYTES_PER_SAMPLE;
    let data_size = u32::try_from(data_bytes)
        .ok()
        .filter(|size| size.checked_add(36).is_some())
        .ok_or(ConversionError::TooLarge { data_bytes })?;
    if u32::from(channels) * 2 > u32::from(u16::MAX) {
        return Err(ConversionError::InvalidDocument(format!(
            "{} channels exceed WAV block alignment limit",
            channel_count
        )));
    }

    let mut bytes = Vec::with_capacity(WAV_HEADER_SIZE + data_size as usize);
    bytes.extend_from_slice(&wav_header(document.sample_rate(), channels, data_size));

    let planes = document.channels();
    for frame in 0..frame_count {
        for plane in planes {
            bytes.extend_from_slice(&sample_to_i16(plane[frame]).to_le_bytes());
        }
    }

    Ok(WavContainer {
        bytes,
        sample_rate: document.sample_rate(),
        channels,
        frame_count,
    })
}
