//! Open/close lifecycle and the producer-side submit path

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use super::consumer::{self, Shared, SharedSink};
use super::sidecar::{sidecar_path, SidecarWriter};
use super::throttle::{frame_duration, ThrottleGate};
use crate::capture::Frame;
use crate::error::{Result, WriterError};
use crate::sink::{FrameSink, StreamParams};
use crate::WriterConfig;

/// Producer-side state, guarded by the submission lock
struct Session {
    gate: ThrottleGate,
    sidecar: SidecarWriter,
    accepted: u64,
    start_time: DateTime<Utc>,
}

/// Throttles submitted frames to the configured rate, records their metadata
/// and hands them to a background thread that converts them to RGB and feeds
/// the sink in acceptance order.
///
/// All methods take `&self`; wrap the writer in an `Arc` to submit from
/// several threads. Dropping the writer closes it.
pub struct VideoFrameWriter {
    config: WriterConfig,
    sidecar_path: PathBuf,
    frame_duration: TimeDelta,

    shared: Arc<Shared>,
    sink: SharedSink,

    /// Submission lock; `None` while closed
    session: Mutex<Option<Session>>,

    /// Lifecycle lock; holds the consumer while open
    consumer: Mutex<Option<JoinHandle<Result<u64>>>>,
}

impl VideoFrameWriter {
    pub fn new(config: WriterConfig, sink: impl FrameSink) -> Result<Self> {
        if config.fps == 0 {
            return Err(WriterError::InvalidFrameRate);
        }

        let sink: Box<dyn FrameSink> = Box::new(sink);

        Ok(Self {
            sidecar_path: sidecar_path(&config.output_path),
            frame_duration: frame_duration(config.fps),
            config,
            shared: Arc::new(Shared::new()),
            sink: Arc::new(Mutex::new(sink)),
            session: Mutex::new(None),
            consumer: Mutex::new(None),
        })
    }

    /// Start a new session, closing the current one first.
    ///
    /// A fault left by the previous session is returned instead, with the
    /// writer closed.
    #[instrument(skip(self), fields(path = %self.config.output_path.display()))]
    pub fn open(&self) -> Result<()> {
        let mut slot = self.consumer.lock();
        self.close_locked(&mut slot)?;

        let sidecar = SidecarWriter::create(&self.sidecar_path, self.config.width, self.config.height)?;

        let params = StreamParams {
            path: self.config.output_path.clone(),
            width: self.config.width,
            height: self.config.height,
            fps: self.config.fps,
            bit_rate: self.config.bit_rate,
        };
        self.sink
            .lock()
            .open(&params)
            .map_err(|source| WriterError::SinkLifecycle {
                stage: "open",
                source,
            })?;

        let start_time = Utc::now();
        self.shared.reset();
        *self.session.lock() = Some(Session {
            gate: ThrottleGate::new(self.frame_duration, start_time),
            sidecar,
            accepted: 0,
            start_time,
        });
        self.shared.is_open.store(true, Ordering::Release);

        match consumer::spawn(self.shared.clone(), self.sink.clone()) {
            Ok(handle) => *slot = Some(handle),
            Err(e) => {
                self.shared.is_open.store(false, Ordering::Release);
                self.session.lock().take();
                if let Err(sink_err) = self.sink.lock().close() {
                    warn!("Sink close after failed start: {}", sink_err);
                }
                return Err(e.into());
            }
        }

        info!(
            "Writer opened: {}x{} @ {} fps, frame duration {} µs",
            self.config.width,
            self.config.height,
            self.config.fps,
            self.frame_duration.num_microseconds().unwrap_or_default()
        );
        Ok(())
    }

    /// Stop accepting frames, wait for the consumer to drain the queue and
    /// exit, then close the sink. Does nothing when already closed.
    ///
    /// Returns the error that stopped the consumer, if any.
    #[instrument(skip(self))]
    pub fn close(&self) -> Result<()> {
        let mut slot = self.consumer.lock();
        self.close_locked(&mut slot)
    }

    fn close_locked(&self, slot: &mut Option<JoinHandle<Result<u64>>>) -> Result<()> {
        let Some(handle) = slot.take() else {
            return Ok(());
        };

        let sidecar_closed = match self.session.lock().take() {
            Some(session) => session.sidecar.finish(),
            None => Ok(()),
        };

        self.shared.is_open.store(false, Ordering::Release);
        self.shared.signal.raise();

        let drained = handle.join().unwrap_or(Err(WriterError::ConsumerPanicked));
        if drained.is_err() {
            let dropped = self.shared.queue.clear();
            if dropped > 0 {
                warn!("Discarded {} frames left behind by the failed consumer", dropped);
            }
        }
        let sink_closed = self.sink.lock().close();

        info!(
            "Writer closed: {} accepted, {} written",
            self.frames_accepted(),
            self.frames_written()
        );

        drained?;
        sidecar_closed?;
        sink_closed.map_err(|source| WriterError::SinkLifecycle {
            stage: "close",
            source,
        })
    }

    pub fn is_open(&self) -> bool {
        self.shared.is_open.load(Ordering::Acquire)
    }

    /// Offer a frame. Returns `Ok(true)` when it was accepted and queued,
    /// `Ok(false)` when the throttle dropped it.
    ///
    /// Never waits on the consumer; the metadata line is written before the
    /// frame is queued.
    pub fn submit(&self, frame: Frame) -> Result<bool> {
        let mut session = self.session.lock();
        let session = session.as_mut().ok_or(WriterError::NotOpen)?;

        if self.shared.faulted.load(Ordering::Acquire) {
            return Err(WriterError::ConsumerFaulted);
        }

        if !session.gate.is_due(frame.timestamp()) {
            metrics::counter!("frames_dropped").increment(1);
            return Ok(false);
        }

        session
            .sidecar
            .record(&frame.timestamp(), session.accepted, frame.pose())?;
        session.gate.accept(frame.timestamp());
        session.accepted += 1;
        self.shared
            .frames_accepted
            .store(session.accepted, Ordering::Release);
        metrics::counter!("frames_accepted").increment(1);
        debug!(index = session.accepted - 1, "Frame accepted");

        self.shared.queue.push(frame);
        self.shared.signal.raise();
        Ok(true)
    }

    /// Whether the consumer has stopped on a fatal error
    pub fn is_faulted(&self) -> bool {
        self.shared.faulted.load(Ordering::Acquire)
    }

    /// Frames accepted by the throttle in the current (or last) session
    pub fn frames_accepted(&self) -> u64 {
        self.shared.frames_accepted.load(Ordering::Acquire)
    }

    /// Frames handed to the sink in the current (or last) session
    pub fn frames_written(&self) -> u64 {
        self.shared.frames_written.load(Ordering::Acquire)
    }

    /// Frames accepted but not yet taken by the consumer
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// When the current session opened; `None` while closed
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.session.lock().as_ref().map(|s| s.start_time)
    }

    pub fn frame_duration(&self) -> TimeDelta {
        self.frame_duration
    }

    pub fn sidecar_path(&self) -> &Path {
        &self.sidecar_path
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }
}

impl Drop for VideoFrameWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Error closing writer on drop: {}", e);
        }
    }
}
