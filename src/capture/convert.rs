use std::borrow::Cow;

use crate::error::{Result, WriterError};

/// Convert a frame's pixels to packed RGB24 for the sink.
///
/// RGB input passes through untouched. For RGBD input the depth channel is
/// spread across R, G and B, giving a grayscale depth image; the colour
/// channels are discarded. A buffer whose length does not match the
/// dimensions is rejected rather than forwarded.
pub fn to_rgb(pixels: &[u8], width: u16, height: u16, channels: u8) -> Result<Cow<'_, [u8]>> {
    if channels != 3 && channels != 4 {
        return Err(WriterError::UnsupportedChannels { channels });
    }

    let pixel_count = width as usize * height as usize;
    let expected = pixel_count * channels as usize;
    if pixels.len() != expected {
        return Err(WriterError::PixelLengthMismatch {
            expected,
            actual: pixels.len(),
        });
    }

    match channels {
        3 => Ok(Cow::Borrowed(pixels)),
        _ => {
            let mut rgb = Vec::with_capacity(pixel_count * 3);
            for px in pixels.chunks_exact(4) {
                let depth = px[3];
                rgb.extend_from_slice(&[depth, depth, depth]);
            }
            Ok(Cow::Owned(rgb))
        }
    }
}
