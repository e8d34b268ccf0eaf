// SPDX-License-Identifier: GPL-3.0-only

//! Camera session abstraction
//!
//! The pipeline never talks to hardware. It consumes a [`CameraSession`],
//! which owns stream negotiation, synchronization and calibration:
//!
//! ```text
//! ┌──────────────────────┐
//! │    DepthSession      │  ← lifecycle, estimation, publishing
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │ CameraSession Trait  │  ← start / pull_frame_pair / stop
//! └──────────┬───────────┘
//!            │
//!      ┌─────┴──────┐
//!      ▼            ▼
//! ┌─────────┐  ┌─────────┐
//! │  Files  │  │ Memory  │
//! └─────────┘  └─────────┘
//! ```
//!
//! # Modules
//!
//! - [`file_source`]: Replays PNG frame sets from a directory
//! - [`memory`]: Serves prepared frame pairs from a queue

pub mod file_source;
pub mod memory;

pub use file_source::FileCameraSession;
pub use memory::MemoryCameraSession;

use crate::depth::CalibrationConstants;
use crate::errors::CaptureError;
use crate::frame::FramePair;
use serde::{Deserialize, Serialize};

/// A stream the camera session can deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Infrared imager selected by stream index
    Infrared(u8),
    /// Hardware depth computed by the camera
    Depth,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Infrared(index) => write!(f, "infrared {}", index),
            StreamKind::Depth => write!(f, "depth"),
        }
    }
}

/// Streams requested when a session starts
///
/// The first infrared stream is the left view, the second the right view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub streams: Vec<StreamKind>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            streams: vec![
                StreamKind::Infrared(1),
                StreamKind::Infrared(2),
                StreamKind::Depth,
            ],
        }
    }
}

impl StreamConfig {
    /// Left and right infrared streams without hardware depth
    pub fn infrared_pair(left: u8, right: u8) -> Self {
        Self {
            streams: vec![StreamKind::Infrared(left), StreamKind::Infrared(right)],
        }
    }

    /// Add the hardware depth stream
    pub fn with_depth(mut self) -> Self {
        if !self.wants_depth() {
            self.streams.push(StreamKind::Depth);
        }
        self
    }

    fn infrared(&self) -> impl Iterator<Item = u8> + '_ {
        self.streams.iter().filter_map(|s| match s {
            StreamKind::Infrared(index) => Some(*index),
            StreamKind::Depth => None,
        })
    }

    /// Stream indices of the left and right views
    pub fn infrared_pair_indices(&self) -> Result<(u8, u8), CaptureError> {
        let mut infrared = self.infrared();
        let left = infrared.next().ok_or_else(|| CaptureError::StreamUnavailable {
            stream: "left infrared (not requested)".to_string(),
        })?;
        let right = infrared.next().ok_or_else(|| CaptureError::StreamUnavailable {
            stream: "right infrared (not requested)".to_string(),
        })?;
        Ok((left, right))
    }

    /// True if hardware depth is requested
    pub fn wants_depth(&self) -> bool {
        self.streams.contains(&StreamKind::Depth)
    }
}

/// Source of synchronized stereo frames and calibration
pub trait CameraSession {
    /// Configure and start the requested streams
    ///
    /// Returns the calibration of the running session. Fails if any requested
    /// stream is unavailable.
    fn start(&mut self, config: &StreamConfig) -> Result<CalibrationConstants, CaptureError>;

    /// Wait for the next synchronized frame set
    ///
    /// May block for an unbounded time.
    fn pull_frame_pair(&mut self) -> Result<FramePair, CaptureError>;

    /// Stop capture and release resources
    fn stop(&mut self);

    /// Name used in logs
    fn name(&self) -> &str {
        "camera"
    }
}

impl<C: CameraSession + ?Sized> CameraSession for Box<C> {
    fn start(&mut self, config: &StreamConfig) -> Result<CalibrationConstants, CaptureError> {
        (**self).start(config)
    }

    fn pull_frame_pair(&mut self) -> Result<FramePair, CaptureError> {
        (**self).pull_frame_pair()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
