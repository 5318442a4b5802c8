use std::fs;
use std::path::{Path, PathBuf};

use image::ColorType;
use tracing::{debug, info};

use super::{FrameSink, SinkError, StreamParams};

/// Writes each frame as `frame_NNNNNN.png`, numbered like the sidecar lines.
///
/// The output directory is the writer's target path when that is a
/// directory, otherwise the directory containing it.
#[derive(Debug, Default)]
pub struct ImageSequenceSink {
    dir: Option<PathBuf>,
    written: u64,
}

impl ImageSequenceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_path(dir: &Path, index: u64) -> PathBuf {
        dir.join(format!("frame_{index:06}.png"))
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for ImageSequenceSink {
    fn open(&mut self, params: &StreamParams) -> Result<(), SinkError> {
        let dir = if params.path.is_dir() {
            params.path.clone()
        } else {
            params
                .path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        };
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(&dir)?;
        }

        info!("Writing PNG sequence to {}", dir.display());
        self.dir = Some(dir);
        self.written = 0;
        Ok(())
    }

    fn write(&mut self, rgb: &[u8], width: u16, height: u16, index: u64) -> Result<(), SinkError> {
        let dir = self.dir.as_deref().ok_or("image sequence sink was not opened")?;
        let path = Self::frame_path(dir, index);

        image::save_buffer(&path, rgb, width.into(), height.into(), ColorType::Rgb8)?;
        self.written += 1;

        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        info!("PNG sequence finished: {} frames", self.written);
        self.dir = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_numbered_pngs() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ImageSequenceSink::new();
        sink.open(&StreamParams {
            path: dir.path().to_path_buf(),
            width: 2,
            height: 1,
            fps: 10,
            bit_rate: None,
        })
        .unwrap();

        sink.write(&[255, 0, 0, 0, 255, 0], 2, 1, 0).unwrap();
        sink.write(&[0, 0, 255, 9, 9, 9], 2, 1, 1).unwrap();
        sink.close().unwrap();

        let img = image::open(ImageSequenceSink::frame_path(dir.path(), 1))
            .unwrap()
            .to_rgb8();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.as_raw(), &vec![0, 0, 255, 9, 9, 9]);
        assert!(ImageSequenceSink::frame_path(dir.path(), 0).exists());
    }

    #[test]
    fn write_before_open_fails() {
        let mut sink = ImageSequenceSink::new();
        assert!(sink.write(&[0, 0, 0], 1, 1, 0).is_err());
    }
}
