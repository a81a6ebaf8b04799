use std::{io, path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::Parser;
use fbcast_capture::DisplayCapture;
use fbcast_enc_ffmpeg::{ElementaryStreamWriter, EncoderConfig};
use fbcast_frame_converter::ChromaSubsampling;
use fbcast_media_info::{FFRational, VideoInfo};
use fbcast_recording::{CapturePipeline, PipelineStats, StopSignal};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, prelude::*};

/// Capture the X11 screen into a raw encoded video stream.
#[derive(Parser, Debug)]
#[command(name = "fbcast", version, about)]
struct Cli {
    /// File the encoded stream is written to
    output: PathBuf,
    /// FFmpeg encoder name, e.g. libx264 or mpeg1video
    codec: String,
    /// X display to capture instead of $DISPLAY
    #[arg(long)]
    display: Option<String>,
    /// Target bitrate in bits per second
    #[arg(long, default_value_t = EncoderConfig::DEFAULT_BITRATE)]
    bitrate: usize,
    /// Frame rate; also sets the time base to 1/FPS. Defaults to 120 fps on a 1/15 time base
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i32::MAX as i64))]
    fps: Option<u32>,
    /// Frames between key frames
    #[arg(long, default_value_t = EncoderConfig::DEFAULT_GOP_SIZE)]
    gop: u32,
    /// Maximum number of consecutive B-frames
    #[arg(long, default_value_t = EncoderConfig::DEFAULT_MAX_B_FRAMES)]
    max_b_frames: usize,
    /// How each 2x2 block is reduced to one chroma sample (top-left or average)
    #[arg(long, default_value_t = ChromaSubsampling::default())]
    chroma: ChromaSubsampling,
    /// Stop after this many frames instead of waiting for Ctrl-C
    #[arg(long)]
    frames: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return usage_exit(&e),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    match run(cli).await {
        Ok(stats) => {
            info!(
                "Captured {} frames ({} bytes)",
                stats.frames_captured, stats.bytes_written
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<PipelineStats> {
    ffmpeg::init().context("Failed to initialize FFmpeg")?;

    let stop = StopSignal::new();

    tokio::spawn({
        let stop = stop.clone();
        async move {
            if watch_interrupts(stop, tokio::signal::ctrl_c).await.is_ok() {
                std::process::exit(1);
            }
        }
    });

    // Xlib handles and codec contexts stay on the blocking thread.
    tokio::task::spawn_blocking(move || record(cli, &stop))
        .await
        .context("Capture thread panicked")?
}

/// Usage errors exit 1, `--help` and `--version` exit 0. Failing to print
/// either is a failure.
fn usage_exit(e: &clap::Error) -> ExitCode {
    if e.print().is_err() || e.use_stderr() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Raises `stop` on the first interrupt so the stream is finalized, and
/// resolves on the second so the caller can abort a stalled capture.
async fn watch_interrupts<F, Fut>(stop: StopSignal, mut interrupted: F) -> io::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    interrupted().await?;
    info!("Interrupted, finishing stream. Press Ctrl-C again to abort");
    stop.stop();

    interrupted().await?;
    warn!("Interrupted again, aborting without finalizing");
    Ok(())
}

fn record(cli: Cli, stop: &StopSignal) -> anyhow::Result<PipelineStats> {
    let capture = open_display(cli.display.as_deref())?;

    let mut video = VideoInfo::yuv420p(capture.width(), capture.height())
        .context("Display size is unusable")?;
    if let Some(fps) = cli.fps {
        video = video
            .with_frame_rate(fps)
            .with_time_base(FFRational(1, fps as i32));
    }

    let config = EncoderConfig::new(&cli.codec, video)
        .with_bitrate(cli.bitrate)
        .with_gop_size(cli.gop)
        .with_max_b_frames(cli.max_b_frames);

    let output = cli.output;
    let pipeline = CapturePipeline::open(capture, config, cli.chroma, || {
        ElementaryStreamWriter::create(&output)
    })
    .with_context(|| format!("Failed to start capture into '{}'", output.display()))?;

    if cli.frames.is_none() {
        info!("Press Ctrl-C to stop");
    }

    let recording = pipeline.run(stop, cli.frames).context("Capture failed")?;

    Ok(recording.stats)
}

#[cfg(all(unix, not(target_os = "macos")))]
fn open_display(name: Option<&str>) -> anyhow::Result<Box<dyn DisplayCapture>> {
    let capture = fbcast_capture::X11Capture::open(name).context("Failed to open X display")?;
    Ok(Box::new(capture))
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn open_display(_name: Option<&str>) -> anyhow::Result<Box<dyn DisplayCapture>> {
    anyhow::bail!("Screen capture needs an X11 display, which this platform does not provide")
}
