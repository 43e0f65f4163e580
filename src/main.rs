use std::path::PathBuf;

use anyhow::{Context, Result};
use audio_intake::{
    AudioAsset, AudioBackend, Config, FileBackend, FormatConverter, FrameRecorder, LevelMonitor,
};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "audio-intake", version, about = "Audio capture, level monitoring and WAV conversion")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(long, global = true, default_value = "config/audio-intake")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert any decodable audio file to 16-bit PCM WAV
    Convert { input: PathBuf, output: PathBuf },

    /// Replay a file through the capture path and report signal warnings
    Monitor {
        input: PathBuf,

        /// Pace playback at the file's sample rate
        #[arg(long)]
        realtime: bool,

        /// Write the captured recording as WAV; without a path it goes to the
        /// configured recordings directory
        #[arg(long, num_args = 0..=1)]
        record: Option<Option<PathBuf>>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    if !FormatConverter::is_supported() {
        anyhow::bail!("Audio decoding is not available in this build");
    }

    match cli.command {
        Command::Convert { input, output } => convert(input, output).await,
        Command::Monitor {
            input,
            realtime,
            record,
        } => monitor(cfg, input, realtime, record).await,
    }
}

async fn convert(input: PathBuf, output: PathBuf) -> Result<()> {
    let converter = FormatConverter::new();
    let asset = AudioAsset::open(&input).await?;

    let wav = converter
        .convert_to_wav(asset)
        .await
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    wav.write_to(&output).await?;

    converter.dispose();
    Ok(())
}

async fn monitor(
    cfg: Config,
    input: PathBuf,
    realtime: bool,
    record: Option<Option<PathBuf>>,
) -> Result<()> {
    let converter = FormatConverter::new();
    let asset = AudioAsset::open(&input).await?;
    let document = converter
        .decode(asset)
        .await
        .with_context(|| format!("Failed to decode {}", input.display()))?;
    converter.dispose();

    info!(
        "Loaded {}: {:.1}s, {}Hz, {} channels (monitoring channel 0)",
        input.display(),
        document.duration_seconds(),
        document.sample_rate(),
        document.channel_count()
    );

    let mut capture = cfg.capture.clone();
    capture.realtime |= realtime;

    let monitor = LevelMonitor::new(cfg.monitor.clone());
    monitor.on_warning(|warning| {
        println!("{}", serde_json::to_string(warning)?);
        Ok(())
    });

    let mut backend = FileBackend::new(document, capture.clone())?;
    let mut recorder =
        FrameRecorder::new(backend.sample_rate(), capture.level_mode).with_monitor(monitor.clone());

    monitor.start();
    let audio_rx = backend.start().await?;
    let summary = recorder.record(audio_rx).await;
    backend.stop().await?;

    // Unpaced playback finishes before the timer fires, so classify once more.
    monitor.check();
    let quality = monitor.get_audio_quality();
    monitor.dispose();

    info!(
        "Captured {:.1}s in {} frames via {}",
        summary.duration_secs,
        summary.frames_received,
        backend.name()
    );
    println!("quality: {}", quality);

    if let Some(path) = record {
        let path = match path {
            Some(path) => path,
            None => {
                let stem = input
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "recording".to_string());
                let dir = PathBuf::from(&cfg.output.recordings_path);
                tokio::fs::create_dir_all(&dir)
                    .await
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                dir.join(format!("{}-capture.wav", stem))
            }
        };
        recorder.save(&path).await?;
    } else if summary.sample_count == 0 {
        warn!("Nothing was captured from {}", input.display());
    }

    Ok(())
}
