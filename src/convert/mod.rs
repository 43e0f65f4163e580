//! Offline conversion of audio assets into canonical WAV containers.
//!
//! Any format the bundled symphonia decoders understand is decoded to planar
//! `f32` PCM and re-encoded as 16-bit little-endian PCM WAV.

mod converter;
mod document;
mod error;
mod wav;

pub use converter::FormatConverter;
pub use document::{AudioAsset, AudioDocument, DecodeContext};
pub use error::ConversionError;
pub use wav::{encode_wav, sample_to_i16, wav_header, WavContainer, WAV_HEADER_SIZE};
