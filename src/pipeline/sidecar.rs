//! Per-frame metadata written next to the video output

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Timelike, Utc};

use crate::error::Result;
use crate::Pose;

pub const SIDECAR_FILE_NAME: &str = "frame_info.txt";

/// Where the sidecar for `target` lives: inside `target` when it is a
/// directory, otherwise beside it.
pub fn sidecar_path(target: &Path) -> PathBuf {
    if target.is_dir() {
        target.join(SIDECAR_FILE_NAME)
    } else {
        target
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(SIDECAR_FILE_NAME)
    }
}

/// Compact ISO-8601, `YYYYMMDDTHHMMSS` with `.ffffff` appended when the
/// timestamp has a sub-second part.
pub fn iso_timestamp(ts: &DateTime<Utc>) -> String {
    if ts.nanosecond() / 1_000 == 0 {
        ts.format("%Y%m%dT%H%M%S").to_string()
    } else {
        ts.format("%Y%m%dT%H%M%S%.6f").to_string()
    }
}

/// Appends one line per accepted frame:
///
/// ```text
/// width=320
/// height=240
/// 20240101T120000.250000 frame_000002 xyzyp: 1.5 64 -3 90 0
/// ```
///
/// Unbuffered: every line goes out in a single `write_all`, so a failed write
/// never leaves a fragment behind to prefix the next line.
pub struct SidecarWriter<W: Write = File> {
    out: W,
}

impl SidecarWriter<File> {
    /// Create (or truncate) the sidecar file and write the dimension header
    pub fn create(path: impl AsRef<Path>, width: u16, height: u16) -> Result<Self> {
        Self::new(File::create(path)?, width, height)
    }
}

impl<W: Write> SidecarWriter<W> {
    pub fn new(mut out: W, width: u16, height: u16) -> Result<Self> {
        out.write_all(format!("width={width}\nheight={height}\n").as_bytes())?;
        out.flush()?;
        Ok(Self { out })
    }

    pub fn record(&mut self, timestamp: &DateTime<Utc>, index: u64, pose: &Pose) -> Result<()> {
        let line = format!(
            "{} frame_{:06} xyzyp: {} {} {} {} {}\n",
            iso_timestamp(timestamp),
            index,
            pose.x,
            pose.y,
            pose.z,
            pose.yaw,
            pose.pitch
        );
        self.out.write_all(line.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use chrono::TimeZone;

    use super::*;

    #[test]
    fn sidecar_goes_inside_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(sidecar_path(dir.path()), dir.path().join(SIDECAR_FILE_NAME));
    }

    #[test]
    fn sidecar_goes_beside_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("run.mp4");
        assert_eq!(sidecar_path(&target), dir.path().join(SIDECAR_FILE_NAME));
    }

    #[test]
    fn timestamp_format() {
        let whole = Utc.with_ymd_and_hms(2016, 7, 4, 9, 5, 3).unwrap();
        assert_eq!(iso_timestamp(&whole), "20160704T090503");

        let frac = whole + chrono::TimeDelta::microseconds(250_000);
        assert_eq!(iso_timestamp(&frac), "20160704T090503.250000");
    }

    #[test]
    fn writes_header_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SIDECAR_FILE_NAME);
        let ts = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();

        let mut sidecar = SidecarWriter::create(&path, 320, 240).unwrap();
        let pose = Pose {
            x: 1.5,
            y: 64.0,
            z: -3.0,
            yaw: 90.0,
            pitch: 0.25,
        };
        sidecar.record(&ts, 0, &pose).unwrap();
        sidecar.record(&ts, 1, &Pose::default()).unwrap();
        sidecar.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "width=320",
                "height=240",
                "20200102T030405 frame_000000 xyzyp: 1.5 64 -3 90 0.25",
                "20200102T030405 frame_000001 xyzyp: 0 0 0 0 0",
            ]
        );
    }

    /// Rejects the write at position `fail_on`, accepts everything else
    struct FlakyOut {
        data: Vec<u8>,
        writes: usize,
        fail_on: usize,
    }

    impl Write for FlakyOut {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            if self.writes == self.fail_on {
                return Err(io::Error::new(io::ErrorKind::Other, "device full"));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_record_leaves_no_fragment() {
        let ts = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        let out = FlakyOut {
            data: Vec::new(),
            writes: 0,
            fail_on: 3,
        };

        let mut sidecar = SidecarWriter::new(out, 2, 2).unwrap();
        sidecar.record(&ts, 0, &Pose::default()).unwrap();
        assert!(sidecar.record(&ts, 1, &Pose::default()).is_err());
        sidecar.record(&ts, 1, &Pose::default()).unwrap();

        let text = String::from_utf8(sidecar.out.data).unwrap();
        assert_eq!(
            text,
            "width=2\nheight=2\n\
             20200102T030405 frame_000000 xyzyp: 0 0 0 0 0\n\
             20200102T030405 frame_000001 xyzyp: 0 0 0 0 0\n"
        );
    }

    #[test]
    fn create_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SIDECAR_FILE_NAME);
        std::fs::write(&path, "stale\nstale\nstale\n").unwrap();

        SidecarWriter::create(&path, 2, 2).unwrap().finish().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "width=2\nheight=2\n");
    }
}
