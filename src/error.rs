use thiserror::Error;

/// Error returned by a [`crate::sink::FrameSink`].
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("frame rate must be greater than zero")]
    InvalidFrameRate,

    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    PixelLengthMismatch { expected: usize, actual: usize },

    /// Fatal for the consumer thread. Only 3 (RGB) and 4 (RGB + depth)
    /// channel frames can be converted.
    #[error("unsupported number of channels: {channels}")]
    UnsupportedChannels { channels: u8 },

    #[error("writer is not open")]
    NotOpen,

    /// The consumer thread stopped on a fatal error; `close()` returns the cause.
    #[error("consumer thread failed, close the writer to retrieve the cause")]
    ConsumerFaulted,

    #[error("consumer thread panicked")]
    ConsumerPanicked,

    #[error("sink failed on frame {index}")]
    Sink {
        index: u64,
        #[source]
        source: SinkError,
    },

    #[error("sink failed to {stage}")]
    SinkLifecycle {
        stage: &'static str,
        #[source]
        source: SinkError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = WriterError> = std::result::Result<T, E>;
