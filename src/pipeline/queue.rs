//! Unbounded FIFO between the producer and the consumer thread

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;
use parking_lot::Mutex;

use crate::Frame;

/// Lossless FIFO of accepted frames.
///
/// Every pushed frame is popped exactly once, in push order. The queue has its
/// own lock; waking the consumer is the job of [`super::WorkSignal`].
pub struct HandoffQueue {
    frames: Mutex<VecDeque<Frame>>,

    /// Statistics
    stats: CachePadded<Stats>,
}

#[derive(Default)]
struct Stats {
    frames_pushed: AtomicUsize,
    frames_popped: AtomicUsize,
}

impl HandoffQueue {
    pub fn new() -> Self {
        Self {
            frames: Mutex::new(VecDeque::new()),
            stats: CachePadded::new(Stats::default()),
        }
    }

    /// Producer: append a frame to the back
    pub fn push(&self, frame: Frame) {
        self.frames.lock().push_back(frame);
        self.stats.frames_pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Consumer: take the front frame, `None` when the queue is empty
    pub fn try_pop(&self) -> Option<Frame> {
        let frame = self.frames.lock().pop_front()?;
        self.stats.frames_popped.fetch_add(1, Ordering::Relaxed);
        Some(frame)
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    /// Drop every queued frame, returning how many there were
    pub fn clear(&self) -> usize {
        let mut frames = self.frames.lock();
        let dropped = frames.len();
        frames.clear();
        dropped
    }

    /// Drop anything left over and zero the statistics
    pub fn reset(&self) {
        self.frames.lock().clear();
        self.stats.frames_pushed.store(0, Ordering::Relaxed);
        self.stats.frames_popped.store(0, Ordering::Relaxed);
    }

    /// (pushed, popped)
    pub fn stats(&self) -> (usize, usize) {
        (
            self.stats.frames_pushed.load(Ordering::Relaxed),
            self.stats.frames_popped.load(Ordering::Relaxed),
        )
    }
}

impl Default for HandoffQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::{TimeDelta, Utc};

    use super::*;
    use crate::Pose;

    fn frame(seq: i64) -> Frame {
        let ts = chrono::DateTime::UNIX_EPOCH + TimeDelta::milliseconds(seq);
        Frame::new(1, 1, 3, vec![0u8; 3], ts, Pose::default()).unwrap()
    }

    #[test]
    fn empty_pop_is_none() {
        let queue = HandoffQueue::new();
        assert!(queue.try_pop().is_none());
        assert_eq!(queue.stats(), (0, 0));
    }

    #[test]
    fn zero_sized_frames_are_real_frames() {
        let queue = HandoffQueue::new();
        queue.push(Frame::new(0, 0, 3, Vec::<u8>::new(), Utc::now(), Pose::default()).unwrap());
        let popped = queue.try_pop().expect("zero-width frame is still a frame");
        assert_eq!(popped.width(), 0);
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn preserves_push_order() {
        let queue = HandoffQueue::new();
        for i in 0..5 {
            queue.push(frame(i));
        }
        assert_eq!(queue.len(), 5);

        let order: Vec<i64> = std::iter::from_fn(|| queue.try_pop())
            .map(|f| f.timestamp().timestamp_millis())
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        assert_eq!(queue.stats(), (5, 5));
    }

    #[test]
    fn lossless_across_threads() {
        let queue = Arc::new(HandoffQueue::new());
        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..1000 {
                    queue.push(frame(i));
                }
            })
        };

        let mut seen = Vec::new();
        while seen.len() < 1000 {
            match queue.try_pop() {
                Some(f) => seen.push(f.timestamp().timestamp_millis()),
                None => thread::yield_now(),
            }
        }
        producer.join().unwrap();

        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert!(queue.is_empty());
        let (pushed, popped) = queue.stats();
        assert_eq!(pushed, popped);
    }

    #[test]
    fn clear_keeps_stats() {
        let queue = HandoffQueue::new();
        queue.push(frame(0));
        queue.push(frame(1));
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.stats(), (2, 0));
    }

    #[test]
    fn reset_clears_frames_and_stats() {
        let queue = HandoffQueue::new();
        queue.push(frame(0));
        queue.reset();
        assert!(queue.is_empty());
        assert_eq!(queue.stats(), (0, 0));
    }
}
