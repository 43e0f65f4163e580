// Integration tests for WAV conversion
//
// These tests build small WAV assets in memory, run them through the
// converter and check the produced container byte for byte.

use anyhow::Result;
use audio_intake::convert::{encode_wav, WAV_HEADER_SIZE};
use audio_intake::{AudioAsset, AudioDocument, ConversionError, FormatConverter};
use std::io::Cursor;

fn wav_asset(sample_rate: u32, channels: u16, interleaved: &[i16]) -> Result<AudioAsset> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut bytes = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec)?;
        for &sample in interleaved {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(AudioAsset::from_bytes(bytes).with_extension("wav"))
}

/// MPEG-1 Layer III frames (128 kbps, 44.1 kHz) whose payload is filler
/// rather than encoded audio. The demuxer accepts them; the decoder cannot.
fn filler_mp3_asset(fill: u8, frames: usize) -> AudioAsset {
    const FRAME_LEN: usize = 417;
    let mut bytes = Vec::with_capacity(FRAME_LEN * frames);
    for _ in 0..frames {
        bytes.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
        bytes.extend(std::iter::repeat(fill).take(FRAME_LEN - 4));
    }
    AudioAsset::from_bytes(bytes).with_extension("mp3")
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[tokio::test]
async fn test_silent_second_converts_to_88244_zero_bytes() -> Result<()> {
    let converter = FormatConverter::new();
    let asset = wav_asset(44_100, 1, &vec![0i16; 44_100])?;

    let wav = converter.convert_to_wav(asset).await?;

    assert_eq!(wav.len(), 88_244);
    assert_eq!(wav.frame_count(), 44_100);
    assert!(wav.data().iter().all(|&b| b == 0x00), "Silence should encode as zero bytes");

    Ok(())
}

#[tokio::test]
async fn test_stereo_round_trip_preserves_layout() -> Result<()> {
    let frames = 1_000usize;
    let mut interleaved = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let left = ((i as i32 * 97) % 65_536 - 32_768) as i16;
        interleaved.push(left);
        interleaved.push((-i32::from(left) / 2) as i16);
    }

    let converter = FormatConverter::new();
    let wav = converter
        .convert_to_wav(wav_asset(48_000, 2, &interleaved)?)
        .await?;

    assert_eq!(wav.len(), WAV_HEADER_SIZE + frames * 2 * 2);

    let bytes = wav.as_bytes();
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(read_u32(bytes, 4), (wav.len() - 8) as u32);
    assert_eq!(&bytes[8..12], b"WAVE");
    assert_eq!(&bytes[12..16], b"fmt ");
    assert_eq!(read_u32(bytes, 16), 16);
    assert_eq!(read_u16(bytes, 20), 1);
    assert_eq!(read_u16(bytes, 22), 2);
    assert_eq!(read_u32(bytes, 24), 48_000);
    assert_eq!(read_u32(bytes, 28), 48_000 * 2 * 2);
    assert_eq!(read_u16(bytes, 32), 4);
    assert_eq!(read_u16(bytes, 34), 16);
    assert_eq!(&bytes[36..40], b"data");
    assert_eq!(read_u32(bytes, 40), (frames * 2 * 2) as u32);

    // Positive samples lose at most one step to the 32767 scale
    let decoded: Vec<i16> = wav
        .data()
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    assert_eq!(decoded.len(), interleaved.len());
    for (i, (&got, &want)) in decoded.iter().zip(&interleaved).enumerate() {
        let diff = (i32::from(got) - i32::from(want)).abs();
        assert!(diff <= 1, "Sample {} drifted: got {}, want {}", i, got, want);
    }

    Ok(())
}

#[tokio::test]
async fn test_output_is_readable_as_wav() -> Result<()> {
    let converter = FormatConverter::new();
    let wav = converter
        .convert_to_wav(wav_asset(16_000, 1, &[0, 1_000, -1_000, 32_767, -32_768])?)
        .await?;

    let reader = hound::WavReader::new(Cursor::new(wav.as_bytes()))?;
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 16_000);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len(), 5);

    Ok(())
}

#[test]
fn test_full_scale_encoding() -> Result<()> {
    let doc = AudioDocument::mono(8_000, vec![1.0, -1.0]);
    let wav = encode_wav(&doc)?;

    let data = wav.data();
    assert_eq!(i16::from_le_bytes([data[0], data[1]]), 32_767);
    assert_eq!(i16::from_le_bytes([data[2], data[3]]), -32_768);

    Ok(())
}

#[test]
fn test_container_length_formula() -> Result<()> {
    for (frames, channels) in [(0usize, 1usize), (1, 1), (441, 2), (100, 6)] {
        let doc = AudioDocument::new(22_050, vec![vec![0.25; frames]; channels])?;
        let wav = encode_wav(&doc)?;
        assert_eq!(wav.len(), 44 + frames * channels * 2);
        assert_eq!(wav.channels() as usize, channels);
    }
    Ok(())
}

#[tokio::test]
async fn test_corrupt_asset_preserves_decoder_message() {
    let converter = FormatConverter::new();
    let asset = AudioAsset::from_bytes(b"definitely not an audio file".repeat(16));

    let err = converter.convert_to_wav(asset).await.unwrap_err();

    match &err {
        ConversionError::Decode(source) => {
            let message = err.to_string();
            assert!(
                message.contains(&source.to_string()),
                "Error message should embed the decoder message: {}",
                message
            );
        }
        other => panic!("Expected decode error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_frames_fail_instead_of_producing_silence() {
    let converter = FormatConverter::new();

    for fill in [0xFF, 0xA5, 0x5A] {
        let err = match converter.convert_to_wav(filler_mp3_asset(fill, 50)).await {
            Ok(wav) => panic!("Fill {:#x} converted to {} bytes instead of failing", fill, wav.len()),
            Err(err) => err,
        };

        let ConversionError::Decode(source) = &err else {
            panic!("Expected decode error for fill {:#x}, got {:?}", fill, err);
        };
        assert!(
            err.to_string().contains(&source.to_string()),
            "Error should carry the decoder message: {}",
            err
        );
    }
}

#[tokio::test]
async fn test_empty_asset_fails() {
    let converter = FormatConverter::new();
    let result = converter.convert_to_wav(AudioAsset::from_bytes(Vec::new())).await;
    assert!(result.is_err(), "Empty input should not convert");
}

#[tokio::test]
async fn test_dispose_then_convert_recreates_context() -> Result<()> {
    let converter = FormatConverter::new();
    converter.dispose();

    let first = converter.convert_to_wav(wav_asset(8_000, 1, &[0; 80])?).await?;
    assert!(converter.is_initialized());

    converter.dispose();
    converter.dispose();
    assert!(!converter.is_initialized());

    let second = converter.convert_to_wav(wav_asset(8_000, 1, &[0; 80])?).await?;
    assert_eq!(first, second);

    Ok(())
}

#[tokio::test]
async fn test_dispose_during_conversion_is_safe() -> Result<()> {
    let converter = FormatConverter::new();
    let asset = wav_asset(44_100, 2, &vec![250; 44_100 * 2])?;

    // join! polls in order, so the conversion holds its context before dispose runs
    let (wav, ()) = tokio::join!(converter.convert_to_wav(asset), async {
        converter.dispose();
    });
    let wav = wav?;

    assert_eq!(wav.frame_count(), 44_100);
    assert_eq!(wav.channels(), 2);
    assert!(!converter.is_initialized());

    let again = converter.convert_to_wav(wav_asset(8_000, 1, &[0; 80])?).await?;
    assert_eq!(again.frame_count(), 80);
    assert!(converter.is_initialized());

    Ok(())
}

#[tokio::test]
async fn test_concurrent_conversions_are_independent() -> Result<()> {
    let converter = FormatConverter::new();
    let mono_asset = wav_asset(8_000, 1, &[100; 800])?;
    let stereo_asset = wav_asset(44_100, 2, &[-100; 882])?;

    let (mono, stereo) = tokio::join!(
        converter.convert_to_wav(mono_asset),
        converter.convert_to_wav(stereo_asset),
    );
    let (mono, stereo) = (mono?, stereo?);

    assert_eq!((mono.sample_rate(), mono.channels(), mono.frame_count()), (8_000, 1, 800));
    assert_eq!((stereo.sample_rate(), stereo.channels(), stereo.frame_count()), (44_100, 2, 441));

    Ok(())
}

#[tokio::test]
async fn test_convert_file_on_disk() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let input = dir.path().join("input.wav");
    let output = dir.path().join("output.wav");

    let asset = wav_asset(22_050, 1, &[500; 2_205])?;
    tokio::fs::write(&input, asset.bytes()).await?;

    let converter = FormatConverter::new();
    let wav = converter.convert_to_wav(AudioAsset::open(&input).await?).await?;
    wav.write_to(&output).await?;

    let written = tokio::fs::read(&output).await?;
    assert_eq!(written.len(), 44 + 2_205 * 2);
    assert_eq!(written, wav.into_bytes());

    Ok(())
}

#[tokio::test]
async fn test_missing_file_fails() {
    let result = AudioAsset::open("/nonexistent/path/to/audio.wav").await;
    assert!(matches!(result, Err(ConversionError::Io(_))));
}
