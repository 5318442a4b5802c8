//! Frame-rate gate run on the producer thread

use chrono::{DateTime, TimeDelta, Utc};

/// Interval between accepted frames for `fps`.
///
/// Integer division in microseconds, so rates that don't divide a second evenly
/// run slightly fast (30 fps gives 33 333 µs). The drift is kept as is.
pub fn frame_duration(fps: u32) -> TimeDelta {
    TimeDelta::microseconds(1_000_000 / i64::from(fps.max(1)))
}

/// Drops frames that arrive sooner than one frame duration after the last
/// accepted one. Never merges or interpolates.
#[derive(Debug, Clone)]
pub struct ThrottleGate {
    frame_duration: TimeDelta,
    last_accepted: DateTime<Utc>,
}

impl ThrottleGate {
    /// Gate primed so that any frame stamped at or after `start` is accepted.
    pub fn new(frame_duration: TimeDelta, start: DateTime<Utc>) -> Self {
        Self {
            frame_duration,
            last_accepted: start - frame_duration,
        }
    }

    /// Accept or drop a frame stamped `timestamp`. Acceptance moves the gate.
    pub fn admit(&mut self, timestamp: DateTime<Utc>) -> bool {
        let due = self.is_due(timestamp);
        if due {
            self.accept(timestamp);
        }
        due
    }

    /// Whether a frame stamped `timestamp` would be accepted, without moving the gate
    pub fn is_due(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp - self.last_accepted >= self.frame_duration
    }

    pub fn accept(&mut self, timestamp: DateTime<Utc>) {
        self.last_accepted = timestamp;
    }

    pub fn last_accepted(&self) -> DateTime<Utc> {
        self.last_accepted
    }
}
