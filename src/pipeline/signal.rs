//! "Work available" flag paired with a condition variable

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Condvar, Mutex};

use super::HandoffQueue;

/// Wakes the consumer when frames are queued or the writer shuts down.
///
/// Guarded by its own lock, separate from the queue's, so producers never wait
/// on the consumer's wait/wake protocol to enqueue.
pub struct WorkSignal {
    available: Mutex<bool>,
    cond: Condvar,
}

impl WorkSignal {
    pub fn new() -> Self {
        Self {
            available: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Mark work as available and wake the consumer
    pub fn raise(&self) {
        *self.available.lock() = true;
        self.cond.notify_one();
    }

    /// Block until the flag is raised or `open` is cleared.
    ///
    /// `open` must be cleared before the closing [`raise`](Self::raise), so a
    /// close that lands between a drain's `settle` and this wait is not missed.
    pub fn wait(&self, open: &AtomicBool) {
        let mut available = self.available.lock();
        while !*available && open.load(Ordering::Acquire) {
            self.cond.wait(&mut available);
        }
    }

    /// Clear the flag if `queue` is really empty.
    ///
    /// The emptiness check runs under the signal lock: a producer that pushed
    /// after the consumer's last pop raises the flag only after this returns,
    /// so its frame is never stranded. Returns `false` when the drain should
    /// continue.
    pub fn settle(&self, queue: &HandoffQueue) -> bool {
        let mut available = self.available.lock();
        if !queue.is_empty() {
            return false;
        }
        *available = false;
        true
    }

    pub fn reset(&self) {
        *self.available.lock() = false;
    }

    pub fn is_raised(&self) -> bool {
        *self.available.lock()
    }
}

impl Default for WorkSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::{Frame, Pose};

    #[test]
    fn raise_releases_waiter() {
        let signal = Arc::new(WorkSignal::new());
        let open = Arc::new(AtomicBool::new(true));
        let waiter = {
            let (signal, open) = (signal.clone(), open.clone());
            thread::spawn(move || signal.wait(&open))
        };

        thread::sleep(Duration::from_millis(20));
        assert!(!waiter.is_finished());

        signal.raise();
        waiter.join().unwrap();
        assert!(signal.is_raised());
    }

    #[test]
    fn closed_flag_releases_waiter_after_settle() {
        let signal = WorkSignal::new();
        let queue = HandoffQueue::new();
        let open = AtomicBool::new(true);

        // Close raises, then a finishing drain clears the flag again.
        open.store(false, Ordering::Release);
        signal.raise();
        assert!(signal.settle(&queue));

        signal.wait(&open);
        assert!(!signal.is_raised());
    }

    #[test]
    fn settle_keeps_flag_while_frames_remain() {
        let signal = WorkSignal::new();
        let queue = HandoffQueue::new();
        signal.raise();

        queue.push(Frame::new(1, 1, 3, vec![1u8, 2, 3], Utc::now(), Pose::default()).unwrap());
        assert!(!signal.settle(&queue));
        assert!(signal.is_raised());

        queue.try_pop();
        assert!(signal.settle(&queue));
        assert!(!signal.is_raised());
    }
}
