// SPDX-License-Identifier: GPL-3.0-only

//! Stereo Depth - software depth from rectified infrared stereo pairs
//!
//! A synchronized left/right infrared pair goes through a disparity
//! estimator and a depth converter, and the results are handed to a sink:
//!
//! ```text
//! CameraSession ─▶ FramePair ─▶ DisparityEstimator ─▶ DisparityMap
//!                                                          │
//!                  Sink ◀─ DepthMap ◀─ DepthConverter ◀────┘
//! ```
//!
//! # Architecture
//!
//! - [`frame`]: Grids, frame pairs, disparity and depth maps
//! - [`stereo`]: Nearest-intensity and block matching disparity strategies
//! - [`depth`]: Calibration and disparity to depth conversion
//! - [`backends`]: Camera session abstraction and frame sources
//! - [`sinks`]: Output of published buffers
//! - [`session`]: Session lifecycle (start / update / stop)
//! - [`runner`]: Run modes and interrupt handling
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! use stereo_depth::backends::FileCameraSession;
//! use stereo_depth::session::{DepthSession, SessionOptions};
//! use stereo_depth::sinks::NullSink;
//!
//! let camera = FileCameraSession::new("recording");
//! let mut session = DepthSession::new(camera, NullSink, SessionOptions::default())?;
//! session.start()?;
//! let summary = session.update()?;
//! session.stop();
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod depth;
pub mod errors;
pub mod frame;
pub mod runner;
pub mod session;
pub mod sinks;
pub mod stereo;

// Re-export commonly used types
pub use backends::{CameraSession, StreamConfig, StreamKind};
pub use config::Config;
pub use depth::{CalibrationConstants, DepthConverter, DepthEncoding};
pub use errors::{CaptureError, DepthError, DepthResult, PreconditionError};
pub use frame::{DepthMap, DisparityKind, DisparityMap, FramePair, Grid, IntensityImage};
pub use runner::RunMode;
pub use session::{DepthSession, FrameSummary, SessionOptions, SessionState};
pub use sinks::{ChannelId, Sink, SinkBuffer};
pub use stereo::{DisparityEstimator, MatchingStrategy};
