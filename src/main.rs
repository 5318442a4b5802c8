//! Framewriter demo: a synthetic source pushing frames faster than the
//! target rate into a PNG-sequence writer

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use framewriter::sink::ImageSequenceSink;
use framewriter::{Config, Frame, Pose, SourceConfig, VideoFrameWriter, WriterConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    init_tracing();

    info!("Framewriter launching...");

    // Load configuration
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    info!("Configuration: {:?}", config);

    // Treat the output path as a directory for the PNG sequence
    std::fs::create_dir_all(&config.writer.output_path)?;

    let writer = Arc::new(VideoFrameWriter::new(
        config.writer.clone(),
        ImageSequenceSink::new(),
    )?);
    writer.open()?;

    let mut interval = tokio::time::interval(Duration::from_secs_f64(
        1.0 / f64::from(config.source.rate_hz.max(1)),
    ));
    let deadline = tokio::time::sleep(Duration::from_secs(config.source.duration_secs));
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut tick = 0u64;
    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("Source finished");
                break;
            }
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            _ = interval.tick() => {
                let frame = synthetic_frame(&config.writer, &config.source, tick)?;
                tick += 1;

                // submit only waits on short-lived locks
                if let Err(e) = writer.submit(frame) {
                    warn!("Submit failed: {}", e);
                    break;
                }
            }
        }
    }

    let writer_ref = writer.clone();
    tokio::task::spawn_blocking(move || writer_ref.close()).await??;

    info!(
        "Framewriter shutting down: {} frames produced, {} accepted, {} written",
        tick,
        writer.frames_accepted(),
        writer.frames_written()
    );
    Ok(())
}

fn init_tracing() {
    let fmt = tracing_subscriber::fmt::layer().with_timer(tracing_subscriber::fmt::time::uptime());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("framewriter=debug"));

    let registry = tracing_subscriber::registry().with(filter).with(fmt);

    #[cfg(feature = "profiling")]
    let registry = registry.with(tracing_tracy::TracyLayer::default());

    registry.init();
}

/// A moving gradient with a depth channel ramping over time
fn synthetic_frame(writer: &WriterConfig, source: &SourceConfig, tick: u64) -> Result<Frame> {
    let (width, height) = (writer.width, writer.height);
    let channels = source.channels;
    if channels != 3 && channels != 4 {
        return Err(eyre!("Synthetic source only produces 3 or 4 channels, got {}", channels));
    }

    let mut pixels = Vec::with_capacity(width as usize * height as usize * channels as usize);
    for y in 0..height as u64 {
        for x in 0..width as u64 {
            pixels.push(((x + tick) % 256) as u8);
            pixels.push(((y + tick) % 256) as u8);
            pixels.push(128);
            if channels == 4 {
                pixels.push(((x + y + tick * 4) % 256) as u8);
            }
        }
    }

    let t = tick as f32;
    let pose = Pose {
        x: t * 0.1,
        y: 64.0,
        z: -t * 0.05,
        yaw: (t * 2.0) % 360.0,
        pitch: 0.0,
    };

    Ok(Frame::new(width, height, channels, Bytes::from(pixels), Utc::now(), pose)?)
}
