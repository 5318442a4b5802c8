use bytes::Bytes;
use flume::{Receiver, Sender};

use super::{FrameSink, SinkError};

/// A converted frame as delivered to the sink
#[derive(Debug, Clone)]
pub struct RgbFrame {
    pub index: u64,
    pub width: u16,
    pub height: u16,
    pub rgb: Bytes,
}

/// Forwards every frame over a flume channel, e.g. to an encoder living on
/// another thread
pub struct ChannelSink {
    tx: Sender<RgbFrame>,
}

impl ChannelSink {
    /// Unbounded so the consumer never stalls on a slow receiver
    pub fn unbounded() -> (Self, Receiver<RgbFrame>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }
}

impl FrameSink for ChannelSink {
    fn write(&mut self, rgb: &[u8], width: u16, height: u16, index: u64) -> Result<(), SinkError> {
        self.tx.send(RgbFrame {
            index,
            width,
            height,
            rgb: Bytes::copy_from_slice(rgb),
        })?;
        Ok(())
    }
}
