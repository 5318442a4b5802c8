pub mod capture;
pub mod error;
pub mod pipeline;
pub mod sink;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use capture::{Frame, Pose};
pub use error::{Result, SinkError, WriterError};
pub use pipeline::VideoFrameWriter;
pub use sink::{FrameSink, StreamParams};

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub writer: WriterConfig,
    pub source: SourceConfig,
}

/// Construction parameters of a [`VideoFrameWriter`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Video file or output directory; the sidecar is placed relative to it
    pub output_path: PathBuf,
    pub width: u16,
    pub height: u16,
    pub fps: u32,
    /// Hint for the encoder, forwarded to the sink untouched
    pub bit_rate: Option<i64>,
}

/// Synthetic frame source used by the demo binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// How often the source produces a frame, usually above the writer's fps
    pub rate_hz: u32,
    /// 3 for RGB, 4 for RGB plus depth
    pub channels: u8,
    pub duration_secs: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("recording"),
            width: 320,
            height: 240,
            fps: 10,
            bit_rate: None,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            rate_hz: 60,
            channels: 4,
            duration_secs: 3,
        }
    }
}

impl Config {
    /// Defaults, overlaid by an optional TOML file, overlaid by
    /// `FRAMEWRITER__SECTION__KEY` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder
            .add_source(
                config::Environment::with_prefix("FRAMEWRITER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
