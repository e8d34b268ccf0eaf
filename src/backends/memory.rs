// SPDX-License-Identifier: GPL-3.0-only

//! In-memory camera session serving prepared frame pairs

use super::{CameraSession, StreamConfig, StreamKind};
use crate::depth::CalibrationConstants;
use crate::errors::CaptureError;
use crate::frame::FramePair;
use std::collections::VecDeque;
use tracing::debug;

/// Camera session backed by a queue of frame pairs
///
/// Used by tests and by callers that already hold decoded images.
pub struct MemoryCameraSession {
    calibration: CalibrationConstants,
    frames: VecDeque<FramePair>,
    available: Vec<StreamKind>,
    started: bool,
    stop_count: usize,
}

impl MemoryCameraSession {
    /// Session offering two infrared streams and hardware depth
    pub fn new(
        calibration: CalibrationConstants,
        frames: impl IntoIterator<Item = FramePair>,
    ) -> Self {
        Self {
            calibration,
            frames: frames.into_iter().collect(),
            available: StreamConfig::default().streams,
            started: false,
            stop_count: 0,
        }
    }

    /// Restrict the streams `start` accepts
    pub fn with_streams(mut self, available: Vec<StreamKind>) -> Self {
        self.available = available;
        self
    }

    /// Frame pairs not yet pulled
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Number of `stop` calls, including repeated ones
    pub fn stop_count(&self) -> usize {
        self.stop_count
    }
}

impl CameraSession for MemoryCameraSession {
    fn start(&mut self, config: &StreamConfig) -> Result<CalibrationConstants, CaptureError> {
        config.infrared_pair_indices()?;
        if let Some(missing) = config.streams.iter().find(|s| !self.available.contains(s)) {
            return Err(CaptureError::StreamUnavailable {
                stream: missing.to_string(),
            });
        }

        self.started = true;
        debug!(frames = self.frames.len(), "Memory camera session started");
        Ok(self.calibration)
    }

    fn pull_frame_pair(&mut self) -> Result<FramePair, CaptureError> {
        if !self.started {
            return Err(CaptureError::NotStarted);
        }
        self.frames.pop_front().ok_or(CaptureError::EndOfStream)
    }

    fn stop(&mut self) {
        self.started = false;
        self.stop_count += 1;
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::IntensityImage;

    fn pair(frame_number: u64) -> FramePair {
        let image = IntensityImage::filled(4, 4, frame_number as u16);
        FramePair::new(frame_number, image.clone(), image, None).unwrap()
    }

    fn calibration() -> CalibrationConstants {
        CalibrationConstants::new(600.0, 50.0, 0.001)
    }

    #[test]
    fn test_serves_frames_in_order() {
        let mut session = MemoryCameraSession::new(calibration(), [pair(0), pair(1)]);
        assert_eq!(session.pull_frame_pair().unwrap_err(), CaptureError::NotStarted);

        assert_eq!(session.start(&StreamConfig::default()).unwrap(), calibration());
        assert_eq!(session.pull_frame_pair().unwrap().frame_number(), 0);
        assert_eq!(session.pull_frame_pair().unwrap().frame_number(), 1);
        assert_eq!(session.pull_frame_pair().unwrap_err(), CaptureError::EndOfStream);
    }

    #[test]
    fn test_unavailable_stream_rejected() {
        let mut session = MemoryCameraSession::new(calibration(), Vec::<FramePair>::new())
            .with_streams(vec![StreamKind::Infrared(1), StreamKind::Infrared(2)]);

        let err = session.start(&StreamConfig::default()).unwrap_err();
        assert_eq!(
            err,
            CaptureError::StreamUnavailable {
                stream: "depth".to_string()
            }
        );
        assert!(!session.is_started());
        assert!(session.start(&StreamConfig::infrared_pair(1, 2)).is_ok());
    }
}
