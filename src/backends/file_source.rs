// SPDX-License-Identifier: GPL-3.0-only

//! Frame replay from a directory of PNG files
//!
//! Layout of a recording directory:
//!
//! ```text
//! calibration.json        {"focal_length": .., "baseline": .., "depth_units": ..}
//! ir1_000000.png          infrared stream 1 (8- or 16-bit grayscale)
//! ir2_000000.png          infrared stream 2
//! depth_000000.png        hardware depth (16-bit grayscale), optional
//! ```
//!
//! Only frame numbers present for every requested stream are replayed.

use super::{CameraSession, StreamConfig, StreamKind};
use crate::constants::file_layout::{
    CALIBRATION_FILE, DEPTH_PREFIX, FRAME_DIGITS, INFRARED_PREFIX, frame_file_name,
};
use crate::depth::CalibrationConstants;
use crate::errors::CaptureError;
use crate::frame::{FramePair, Grid, IntensityImage};
use image::DynamicImage;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Streams selected at start
#[derive(Debug)]
struct ActiveStreams {
    left: u8,
    right: u8,
    depth: bool,
    frames: Vec<u64>,
    cursor: usize,
}

/// Camera session replaying recorded frame sets
pub struct FileCameraSession {
    dir: PathBuf,
    repeat: bool,
    calibration: Option<CalibrationConstants>,
    active: Option<ActiveStreams>,
    pulled: u64,
}

impl FileCameraSession {
    /// Replay `dir`, reading calibration from its `calibration.json`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            repeat: false,
            calibration: None,
            active: None,
            pulled: 0,
        }
    }

    /// Start over at the first frame instead of ending the stream
    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    /// Use fixed calibration instead of `calibration.json`
    pub fn with_calibration(mut self, calibration: CalibrationConstants) -> Self {
        self.calibration = Some(calibration);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of frame sets available after `start`
    pub fn frame_count(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.frames.len())
    }

    fn read_calibration(&self) -> Result<CalibrationConstants, CaptureError> {
        if let Some(calibration) = self.calibration {
            return Ok(calibration);
        }

        let path = self.dir.join(CALIBRATION_FILE);
        let contents = std::fs::read_to_string(&path).map_err(|e| {
            CaptureError::Calibration(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            CaptureError::Calibration(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    fn load_frame(&self, active: &ActiveStreams, frame: u64) -> Result<FramePair, CaptureError> {
        let left_name = infrared_prefix(active.left);
        let right_name = infrared_prefix(active.right);

        let left = load_intensity(
            &self.dir.join(frame_file_name(&left_name, frame)),
            &StreamKind::Infrared(active.left).to_string(),
        )?;
        let right = load_intensity(
            &self.dir.join(frame_file_name(&right_name, frame)),
            &StreamKind::Infrared(active.right).to_string(),
        )?;
        let depth = if active.depth {
            Some(load_depth(&self.dir.join(frame_file_name(DEPTH_PREFIX, frame)))?)
        } else {
            None
        };

        FramePair::new(self.pulled, left, right, depth).map_err(|e| CaptureError::FrameDecode {
            stream: format!("frame set {}", frame),
            reason: e.to_string(),
        })
    }
}

impl CameraSession for FileCameraSession {
    fn start(&mut self, config: &StreamConfig) -> Result<CalibrationConstants, CaptureError> {
        let (left, right) = config.infrared_pair_indices()?;
        let depth = config.wants_depth();

        if !self.dir.is_dir() {
            return Err(CaptureError::Io(format!(
                "frame directory not found: {}",
                self.dir.display()
            )));
        }

        let mut frames = frame_numbers(&self.dir, &infrared_prefix(left))?;
        let mut required = vec![(StreamKind::Infrared(right), infrared_prefix(right))];
        if depth {
            required.push((StreamKind::Depth, DEPTH_PREFIX.to_string()));
        }
        if frames.is_empty() {
            return Err(CaptureError::StreamUnavailable {
                stream: StreamKind::Infrared(left).to_string(),
            });
        }
        for (stream, prefix) in required {
            let available = frame_numbers(&self.dir, &prefix)?;
            if available.is_empty() {
                return Err(CaptureError::StreamUnavailable {
                    stream: stream.to_string(),
                });
            }
            frames = frames.intersection(&available).copied().collect();
        }
        if frames.is_empty() {
            return Err(CaptureError::StreamUnavailable {
                stream: "synchronized frame set".to_string(),
            });
        }

        let calibration = self.read_calibration()?;

        info!(
            dir = %self.dir.display(),
            left,
            right,
            depth,
            frames = frames.len(),
            "File camera session started"
        );

        self.active = Some(ActiveStreams {
            left,
            right,
            depth,
            frames: frames.into_iter().collect(),
            cursor: 0,
        });
        self.pulled = 0;
        Ok(calibration)
    }

    fn pull_frame_pair(&mut self) -> Result<FramePair, CaptureError> {
        let Some(mut active) = self.active.take() else {
            return Err(CaptureError::NotStarted);
        };

        if active.cursor >= active.frames.len() {
            if !self.repeat {
                self.active = Some(active);
                return Err(CaptureError::EndOfStream);
            }
            debug!("Restarting frame replay");
            active.cursor = 0;
        }

        let frame = active.frames[active.cursor];
        let result = self.load_frame(&active, frame);
        active.cursor += 1;
        self.active = Some(active);

        let pair = result?;
        debug!(frame, pulled = self.pulled, "Frame set loaded");
        self.pulled += 1;
        Ok(pair)
    }

    fn stop(&mut self) {
        if self.active.take().is_some() {
            info!(dir = %self.dir.display(), "File camera session stopped");
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}

fn infrared_prefix(index: u8) -> String {
    format!("{}{}", INFRARED_PREFIX, index)
}

/// Frame numbers of `{prefix}_{NNNNNN}.png` files in `dir`
fn frame_numbers(dir: &Path, prefix: &str) -> Result<BTreeSet<u64>, CaptureError> {
    let mut frames = BTreeSet::new();
    for entry in std::fs::read_dir(dir)? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        let Some(number) = name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|rest| rest.strip_suffix(".png"))
        else {
            continue;
        };
        if number.len() != FRAME_DIGITS {
            continue;
        }
        if let Ok(frame) = number.parse::<u64>() {
            frames.insert(frame);
        }
    }
    Ok(frames)
}

/// Load a grayscale image as intensity samples
///
/// 16-bit files keep their samples, anything else is converted to 8-bit luma.
pub fn load_intensity(path: &Path, stream: &str) -> Result<IntensityImage, CaptureError> {
    let decoded = open_image(path, stream)?;
    let (width, height) = (decoded.width() as usize, decoded.height() as usize);

    let image = match decoded {
        DynamicImage::ImageLuma16(buffer) => Grid::from_vec(width, height, buffer.into_raw()),
        other => IntensityImage::from_y8(width, height, other.to_luma8().as_raw()),
    };
    image.map_err(|e| CaptureError::FrameDecode {
        stream: stream.to_string(),
        reason: e.to_string(),
    })
}

/// Load a 16-bit hardware depth image
pub fn load_depth(path: &Path) -> Result<Grid<u16>, CaptureError> {
    let stream = StreamKind::Depth.to_string();
    match open_image(path, &stream)? {
        DynamicImage::ImageLuma16(buffer) => {
            let (width, height) = (buffer.width() as usize, buffer.height() as usize);
            Grid::from_vec(width, height, buffer.into_raw()).map_err(|e| CaptureError::FrameDecode {
                stream,
                reason: e.to_string(),
            })
        }
        _ => Err(CaptureError::FrameDecode {
            stream,
            reason: format!("{} is not 16-bit grayscale", path.display()),
        }),
    }
}

fn open_image(path: &Path, stream: &str) -> Result<DynamicImage, CaptureError> {
    image::open(path).map_err(|e| CaptureError::FrameDecode {
        stream: stream.to_string(),
        reason: format!("{}: {}", path.display(), e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "stereo-depth-file-source-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_gray(dir: &Path, prefix: &str, frame: u64, value: u8) {
        GrayImage::from_pixel(6, 4, Luma([value]))
            .save(dir.join(frame_file_name(prefix, frame)))
            .unwrap();
    }

    fn write_depth(dir: &Path, frame: u64, value: u16) {
        ImageBuffer::<Luma<u16>, Vec<u16>>::from_pixel(6, 4, Luma([value]))
            .save(dir.join(frame_file_name(DEPTH_PREFIX, frame)))
            .unwrap();
    }

    fn write_calibration(dir: &Path) {
        std::fs::write(
            dir.join(CALIBRATION_FILE),
            r#"{"focal_length": 600.0, "baseline": 50.0, "depth_units": 0.001}"#,
        )
        .unwrap();
    }

    #[test]
    fn test_replays_synchronized_frames() {
        let dir = scratch_dir("replay");
        write_calibration(&dir);
        for frame in 0..3 {
            write_gray(&dir, "ir1", frame, 10 + frame as u8);
            write_gray(&dir, "ir2", frame, 20 + frame as u8);
            write_depth(&dir, frame, 1000);
        }
        // Unmatched right frame is skipped
        write_gray(&dir, "ir2", 7, 0);

        let mut session = FileCameraSession::new(&dir);
        let calibration = session.start(&StreamConfig::default()).unwrap();
        assert_eq!(calibration, CalibrationConstants::new(600.0, 50.0, 0.001));
        assert_eq!(session.frame_count(), 3);

        for expected in 0..3u16 {
            let pair = session.pull_frame_pair().unwrap();
            assert_eq!(pair.frame_number(), u64::from(expected));
            assert_eq!(pair.dimensions(), (6, 4));
            assert_eq!(pair.left().get(0, 0), 10 + expected);
            assert_eq!(pair.right().get(3, 5), 20 + expected);
            assert_eq!(pair.hardware_depth().unwrap().get(1, 1), 1000);
        }
        assert_eq!(session.pull_frame_pair().unwrap_err(), CaptureError::EndOfStream);

        session.stop();
        assert_eq!(session.pull_frame_pair().unwrap_err(), CaptureError::NotStarted);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_repeat_wraps_around() {
        let dir = scratch_dir("repeat");
        write_gray(&dir, "ir0", 0, 1);
        write_gray(&dir, "ir1", 0, 2);

        let mut session = FileCameraSession::new(&dir)
            .with_repeat(true)
            .with_calibration(CalibrationConstants::new(1.0, 1.0, 1.0));
        session.start(&StreamConfig::infrared_pair(0, 1)).unwrap();

        for pulled in 0..3 {
            let pair = session.pull_frame_pair().unwrap();
            assert_eq!(pair.frame_number(), pulled);
            assert!(pair.hardware_depth().is_none());
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_depth_stream_is_named() {
        let dir = scratch_dir("missing-depth");
        write_calibration(&dir);
        write_gray(&dir, "ir1", 0, 1);
        write_gray(&dir, "ir2", 0, 2);

        let mut session = FileCameraSession::new(&dir);
        let err = session.start(&StreamConfig::default()).unwrap_err();
        assert_eq!(
            err,
            CaptureError::StreamUnavailable {
                stream: "depth".to_string()
            }
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_calibration() {
        let dir = scratch_dir("missing-calibration");
        write_gray(&dir, "ir1", 0, 1);
        write_gray(&dir, "ir2", 0, 2);

        let mut session = FileCameraSession::new(&dir);
        let err = session
            .start(&StreamConfig::infrared_pair(1, 2))
            .unwrap_err();
        assert!(matches!(err, CaptureError::Calibration(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_eight_bit_depth_rejected() {
        let dir = scratch_dir("depth-format");
        write_gray(&dir, DEPTH_PREFIX, 0, 1);

        let err = load_depth(&dir.join(frame_file_name(DEPTH_PREFIX, 0))).unwrap_err();
        assert!(matches!(err, CaptureError::FrameDecode { ref stream, .. } if stream == "depth"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
