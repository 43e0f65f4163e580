use std::io::Cursor;
use std::path::Path;

use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CodecRegistry, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::{Hint, Probe};
use tracing::{debug, info, warn};

use super::error::ConversionError;

/// Raw bytes of an encoded audio asset (WAV, MP3, FLAC, OGG, M4A, ...).
#[derive(Debug, Clone)]
pub struct AudioAsset {
    bytes: Vec<u8>,
    /// File extension used as a probe hint, e.g. "mp3"
    extension: Option<String>,
}

impl AudioAsset {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            extension: None,
        }
    }

    /// Attach a file extension hint so the probe can skip content sniffing.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Read an asset from disk, using the path's extension as probe hint.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, ConversionError> {
        let path = path.as_ref();
        info!("Opening audio asset: {}", path.display());

        let bytes = tokio::fs::read(path).await?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_owned);

        Ok(Self { bytes, extension })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Decoded multi-channel floating point PCM.
///
/// Channel buffers are planar: `channels[c][f]` is the sample of channel `c`
/// at frame `f`. All channels hold exactly `frame_count` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioDocument {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
    frame_count: usize,
}

impl AudioDocument {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, ConversionError> {
        let frame_count = match channels.first() {
            Some(first) => first.len(),
            None => {
                return Err(ConversionError::InvalidDocument(
                    "document has no channels".to_string(),
                ))
            }
        };

        if let Some((index, channel)) = channels
            .iter()
            .enumerate()
            .find(|(_, channel)| channel.len() != frame_count)
        {
            return Err(ConversionError::InvalidDocument(format!(
                "channel {} has {} frames, expected {}",
                index,
                channel.len(),
                frame_count
            )));
        }

        Ok(Self {
            sample_rate,
            channels,
            frame_count,
        })
    }

    /// Single-channel document.
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        let frame_count = samples.len();
        Self {
            sample_rate,
            channels: vec![samples],
            frame_count,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count as f64 / self.sample_rate as f64
    }
}

/// Format probe plus codec registry used to decode assets.
///
/// Owned by a [`FormatConverter`](super::FormatConverter) and shared by its
/// in-flight conversions.
pub struct DecodeContext {
    probe: Probe,
    codecs: CodecRegistry,
}

impl DecodeContext {
    pub fn new() -> Self {
        let mut probe = Probe::default();
        symphonia::default::register_enabled_formats(&mut probe);

        let mut codecs = CodecRegistry::new();
        symphonia::default::register_enabled_codecs(&mut codecs);

        Self { probe, codecs }
    }

    /// Decode every packet of the first audio track into an [`AudioDocument`].
    ///
    /// Sample rate and channel count are whatever the decoder reports for the
    /// first decoded buffer. Undecodable packets are skipped, but when none of
    /// them yields audio the last decoder error is returned.
    pub fn decode(&self, asset: AudioAsset) -> Result<AudioDocument, ConversionError> {
        let mut hint = Hint::new();
        if let Some(extension) = asset.extension() {
            hint.with_extension(extension);
        }

        let source = Cursor::new(asset.bytes);
        let stream = MediaSourceStream::new(Box::new(source), Default::default());

        let probed = self.probe.format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(ConversionError::NoAudioTrack)?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let mut decoder = self.codecs.make(&params, &DecoderOptions::default())?;

        // Layout of the first decoded buffer, authoritative over the demuxer's params
        let mut decoded_spec: Option<SignalSpec> = None;
        let mut planar: Vec<Vec<f32>> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;
        let mut frames_decoded = 0usize;
        let mut skipped_packets = 0usize;
        let mut last_decode_error: Option<&'static str> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    skipped_packets += 1;
                    last_decode_error = Some(e);
                    debug!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            match decoded_spec {
                None => {
                    decoded_spec = Some(spec);
                    planar = vec![Vec::new(); channels];
                }
                Some(first) if first.channels.count() != channels => {
                    let err = SymphoniaError::DecodeError("channel layout changed mid-stream");
                    return Err(err.into());
                }
                Some(_) => {}
            }

            let frames = decoded.frames();
            if frames == 0 {
                continue;
            }

            let needs_alloc = sample_buf
                .as_ref()
                .map_or(true, |buf| buf.capacity() < decoded.capacity() * channels);
            if needs_alloc {
                sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }

            if let Some(buf) = sample_buf.as_mut() {
                buf.copy_planar_ref(decoded);
                let samples = buf.samples();
                for (channel, out) in planar.iter_mut().enumerate() {
                    let start = channel * frames;
                    out.extend_from_slice(&samples[start..start + frames]);
                }
                frames_decoded += frames;
            }
        }

        if frames_decoded == 0 {
            if let Some(message) = last_decode_error {
                return Err(SymphoniaError::DecodeError(message).into());
            }
        }
        if skipped_packets > 0 {
            warn!("{} packets could not be decoded and were skipped", skipped_packets);
        }

        let (sample_rate, channel_count) = match decoded_spec {
            Some(spec) => (spec.rate, spec.channels.count()),
            None => (
                params
                    .sample_rate
                    .ok_or(ConversionError::MissingParameter("a sample rate"))?,
                params
                    .channels
                    .map(|channels| channels.count())
                    .ok_or(ConversionError::MissingParameter("a channel layout"))?,
            ),
        };
        if planar.is_empty() {
            planar = vec![Vec::new(); channel_count.max(1)];
        }

        let document = AudioDocument::new(sample_rate, planar)?;
        debug!(
            "Decoded {} frames, {} Hz, {} channels",
            document.frame_count(),
            document.sample_rate(),
            document.channel_count()
        );

        Ok(document)
    }
}

impl Default for DecodeContext {
    fn default() -> Self {
        Self::new()
    }
}
