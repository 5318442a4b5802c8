//! Background thread that drains the hand-off queue into the sink

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::{HandoffQueue, WorkSignal};
use crate::capture::{to_rgb, Frame};
use crate::error::{Result, WriterError};
use crate::sink::FrameSink;

/// State shared between the writer and its consumer thread
pub(crate) struct Shared {
    pub queue: HandoffQueue,
    pub signal: WorkSignal,
    /// Cleared by `close()`; the consumer exits after the drain that follows
    /// observing it
    pub is_open: AtomicBool,
    /// Set by the consumer just before it stops on a fatal error
    pub faulted: AtomicBool,
    pub frames_accepted: AtomicU64,
    pub frames_written: AtomicU64,
}

impl Shared {
    pub fn new() -> Self {
        Self {
            queue: HandoffQueue::new(),
            signal: WorkSignal::new(),
            is_open: AtomicBool::new(false),
            faulted: AtomicBool::new(false),
            frames_accepted: AtomicU64::new(0),
            frames_written: AtomicU64::new(0),
        }
    }

    /// Back to a fresh session
    pub fn reset(&self) {
        self.queue.reset();
        self.signal.reset();
        self.faulted.store(false, Ordering::Release);
        self.frames_accepted.store(0, Ordering::Release);
        self.frames_written.store(0, Ordering::Release);
    }
}

pub(crate) type SharedSink = Arc<Mutex<Box<dyn FrameSink>>>;

/// Start the consumer. The thread yields the number of frames written, or
/// the error that stopped it.
pub(crate) fn spawn(shared: Arc<Shared>, sink: SharedSink) -> std::io::Result<JoinHandle<Result<u64>>> {
    thread::Builder::new()
        .name("frame-consumer".into())
        .spawn(move || {
            // Held for the whole session; open/close only touch the sink while
            // no consumer runs.
            let mut sink = sink.lock();

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| run(&shared, &mut **sink)))
                .unwrap_or(Err(WriterError::ConsumerPanicked));

            match &outcome {
                Ok(written) => info!("Consumer finished after {} frames", written),
                Err(e) => {
                    error!("Consumer stopped: {}", e);
                    shared.faulted.store(true, Ordering::Release);
                }
            }
            outcome
        })
}

/// Wait for work, drain the queue, repeat until the writer closes.
///
/// `is_open` is read after waking and before draining. `close()` clears it
/// only once no more frames can be pushed, so the drain that follows seeing
/// it cleared is the final one and leaves the queue empty.
fn run(shared: &Shared, sink: &mut dyn FrameSink) -> Result<u64> {
    let mut index = 0u64;

    loop {
        shared.signal.wait(&shared.is_open);
        let closing = !shared.is_open.load(Ordering::Acquire);

        loop {
            match shared.queue.try_pop() {
                Some(frame) => {
                    write_frame(sink, &frame, index)?;
                    index += 1;
                    shared.frames_written.store(index, Ordering::Release);
                }
                None => {
                    if shared.signal.settle(&shared.queue) {
                        break;
                    }
                }
            }
        }

        if closing {
            return Ok(index);
        }
    }
}

fn write_frame(sink: &mut dyn FrameSink, frame: &Frame, index: u64) -> Result<()> {
    let convert_start = Instant::now();
    let rgb = to_rgb(frame.pixels(), frame.width(), frame.height(), frame.channels())?;
    metrics::histogram!("convert_time_us").record(convert_start.elapsed().as_micros() as f64);

    sink.write(&rgb, frame.width(), frame.height(), index)
        .map_err(|source| WriterError::Sink { index, source })?;
    metrics::counter!("frames_written").increment(1);

    debug!(index, "Frame written");
    Ok(())
}
