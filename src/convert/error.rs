use thiserror::Error;

/// Errors surfaced by [`FormatConverter::convert_to_wav`](super::FormatConverter::convert_to_wav)
/// and the WAV encoder.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The asset could not be probed or decoded. The decoder's own message is kept.
    #[error("audio conversion failed: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    /// The container held no track with a decodable codec.
    #[error("audio conversion failed: no decodable audio track found")]
    NoAudioTrack,

    /// The decoder never reported a sample rate or channel layout.
    #[error("audio conversion failed: decoder did not report {0}")]
    MissingParameter(&'static str),

    /// Channel buffers of an [`AudioDocument`](super::AudioDocument) disagree in length,
    /// or the document has no channels.
    #[error("invalid audio document: {0}")]
    InvalidDocument(String),

    /// The PCM payload would not fit in the 32-bit RIFF size fields.
    #[error("audio too large for WAV container: {data_bytes} data bytes")]
    TooLarge { data_bytes: u64 },

    #[error("failed to read audio asset: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking conversion task was cancelled or panicked.
    #[error("conversion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
