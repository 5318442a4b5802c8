//! Encoder-side interface the consumer thread feeds

pub mod channel;
pub mod image_seq;

use std::path::PathBuf;

pub use channel::{ChannelSink, RgbFrame};
pub use image_seq::ImageSequenceSink;

pub use crate::error::SinkError;

/// Stream parameters handed to the sink when the writer opens
#[derive(Debug, Clone, PartialEq)]
pub struct StreamParams {
    pub path: PathBuf,
    pub width: u16,
    pub height: u16,
    pub fps: u32,
    /// Passed through untouched; the writer never reads it
    pub bit_rate: Option<i64>,
}

/// Receives converted RGB24 frames, one call per frame, in acceptance order.
///
/// Only the consumer thread calls `write`, so implementations need no
/// synchronization of their own. An error from `write` is fatal for the
/// consumer thread.
pub trait FrameSink: Send + 'static {
    /// Called from `open()` before the consumer thread starts
    fn open(&mut self, _params: &StreamParams) -> Result<(), SinkError> {
        Ok(())
    }

    /// `rgb` holds exactly `width * height * 3` bytes. `index` starts at 0 for
    /// each session and increases by one per call.
    fn write(&mut self, rgb: &[u8], width: u16, height: u16, index: u64) -> Result<(), SinkError>;

    /// Called from `close()` once the consumer thread has been joined
    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn open(&mut self, params: &StreamParams) -> Result<(), SinkError> {
        (**self).open(params)
    }

    fn write(&mut self, rgb: &[u8], width: u16, height: u16, index: u64) -> Result<(), SinkError> {
        (**self).write(rgb, width, height, index)
    }

    fn close(&mut self) -> Result<(), SinkError> {
        (**self).close()
    }
}
