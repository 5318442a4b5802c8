use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WriterError};

/// Camera position and orientation at capture time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub yaw: f32,
    pub pitch: f32,
}

/// A captured frame with its timestamp and pose.
///
/// Fields are read-only so the pixel length always matches the dimensions.
#[derive(Debug, Clone)]
pub struct Frame {
    width: u16,
    height: u16,
    /// 3 for RGB, 4 for RGB plus a depth channel
    channels: u8,

    /// Immutable pixel data - can be shared across threads without copying
    pixels: Bytes,

    timestamp: DateTime<Utc>,
    pose: Pose,
}

impl Frame {
    /// Build a frame, checking that `pixels` is exactly `width * height * channels` bytes.
    ///
    /// The channel count itself is not checked here; frames the consumer cannot
    /// convert fail there.
    pub fn new(
        width: u16,
        height: u16,
        channels: u8,
        pixels: impl Into<Bytes>,
        timestamp: DateTime<Utc>,
        pose: Pose,
    ) -> Result<Self> {
        let pixels = pixels.into();
        let expected = width as usize * height as usize * channels as usize;
        if pixels.len() != expected {
            return Err(WriterError::PixelLengthMismatch {
                expected,
                actual: pixels.len(),
            });
        }

        Ok(Self {
            width,
            height,
            channels,
            pixels,
            timestamp,
            pose,
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn pixels(&self) -> &Bytes {
        &self.pixels
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}
