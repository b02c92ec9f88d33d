//! Point Cloud Recorder - streamed camera poses and feature points, flushed to disk.
//!
//! This is the main library crate. It provides the frame buffering and
//! flush pipeline plus a headless runner driven by host commands on stdin.

pub mod artifact;
pub mod commands;
pub mod config;
pub mod frame;
pub mod recorder;
pub mod source;
pub mod utils;

use commands::recording::{self, RecorderState};
use config::RecorderConfig;
use source::{CaptureSession, SyntheticSource};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Frame rate of the synthetic source used by the runner
const FRAME_RATE_HZ: u32 = 30;

/// Initialize tracing/logging on stderr
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pointcloud_recorder_lib=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Run the headless recorder
///
/// Reads one host command per stdin line (`flush`, `stats`, `pause`,
/// `resume`, `quit`) and answers with JSON on stdout.
pub fn run() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting Point Cloud Recorder v{}", env!("CARGO_PKG_VERSION"));

    let config = RecorderConfig::from_env()?;
    tracing::info!("Writing artifacts to {:?}", config.output_dir);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(config))
}

async fn serve(config: RecorderConfig) -> anyhow::Result<()> {
    let source = Arc::new(SyntheticSource::new());
    let session = CaptureSession::new(source.clone(), config);
    let producer = source.spawn(session.ingestor(), FRAME_RATE_HZ);
    let state = RecorderState::new(session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "flush" => match recording::flush_recording(&state).await {
                Ok(summary) => println!("{}", serde_json::to_string(&summary)?),
                Err(error) => println!("{}", serde_json::to_string(&error)?),
            },
            "stats" => {
                let stats = recording::get_buffer_stats(&state);
                println!("{}", serde_json::to_string(&stats)?);
            }
            "pause" => {
                if let Err(error) = recording::pause_capture(&state).await {
                    println!("{}", serde_json::to_string(&error)?);
                }
            }
            "resume" => {
                if let Err(error) = recording::resume_capture(&state).await {
                    println!("{}", serde_json::to_string(&error)?);
                }
            }
            "quit" | "exit" => break,
            other => tracing::warn!("Unknown command: {}", other),
        }
    }

    producer.abort();
    tracing::info!("Recorder stopped");
    Ok(())
}
