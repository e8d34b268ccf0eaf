// SPDX-License-Identifier: GPL-3.0-only

//! Depth session lifecycle
//!
//! ```text
//! Uninitialized ──start──▶ Started ──update──▶ Running ──┐
//!       │                     │                  ▲  │     │
//!       │                     │                  └──┘     │
//!       └───────stop──────────┴──────stop/capture error───┴──▶ Stopped
//! ```
//!
//! A stopped session stays stopped. Create a new one to capture again.

use crate::backends::{CameraSession, StreamConfig};
use crate::config::Config;
use crate::constants::timing::FRAME_LOG_INTERVAL;
use crate::depth::visualization::{PreviewOptions, depth_to_rgba};
use crate::depth::{CalibrationConstants, DepthConverter, DepthEncoding};
use crate::errors::{CaptureError, DepthError, DepthResult};
use crate::frame::{DepthMap, FramePair};
use crate::sinks::{ChannelId, Sink, SinkBuffer};
use crate::stereo::{DisparityEstimator, MatchingStrategy};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Lifecycle state of a [`DepthSession`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionState {
    /// Created, camera not started
    Uninitialized,
    /// Camera started, no frame processed yet
    Started(CalibrationConstants),
    /// At least one frame processed
    Running(CalibrationConstants),
    /// Camera released; terminal
    Stopped,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Started(_) => "started",
            SessionState::Running(_) => "running",
            SessionState::Stopped => "stopped",
        }
    }

    /// Calibration while the camera is live
    pub fn calibration(&self) -> Option<CalibrationConstants> {
        match self {
            SessionState::Started(c) | SessionState::Running(c) => Some(*c),
            SessionState::Uninitialized | SessionState::Stopped => None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.calibration().is_some()
    }
}

/// Processing parameters of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub strategy: MatchingStrategy,
    pub streams: StreamConfig,
    /// Fixed-point factor of the metric formula
    pub quantization_factor: f64,
    /// Display scale of the inverse-cost formula
    pub cost_scale: f64,
    /// Publish a colorized preview on channel 4
    pub preview: Option<PreviewOptions>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            strategy: config.strategy,
            streams: config.streams.clone(),
            quantization_factor: config.quantization_factor,
            cost_scale: config.cost_scale,
            preview: config.preview.then(|| PreviewOptions {
                grayscale: config.preview_grayscale,
                ..Default::default()
            }),
        }
    }
}

/// Outcome of one processed frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSummary {
    pub frame_number: u64,
    pub width: usize,
    pub height: usize,
    /// Cells with a computed depth
    pub valid_pixels: usize,
    /// Smallest and largest computed depth
    pub depth_range: Option<(f64, f64)>,
    /// Estimation and conversion time
    pub elapsed: Duration,
}

/// Pulls frame pairs from a camera, computes depth and publishes the results
pub struct DepthSession<C: CameraSession, S: Sink> {
    camera: C,
    sink: S,
    estimator: DisparityEstimator,
    encoding: DepthEncoding,
    streams: StreamConfig,
    preview: Option<PreviewOptions>,
    state: SessionState,
    frames: u64,
}

impl<C: CameraSession, S: Sink> DepthSession<C, S> {
    /// Create an uninitialized session, rejecting invalid parameters
    pub fn new(camera: C, sink: S, options: SessionOptions) -> DepthResult<Self> {
        let estimator = DisparityEstimator::new(options.strategy)?;
        let encoding = DepthEncoding::for_kind(
            options.strategy.output_kind(),
            options.quantization_factor,
            options.cost_scale,
        );

        Ok(Self {
            camera,
            sink,
            estimator,
            encoding,
            streams: options.streams,
            preview: options.preview,
            state: SessionState::Uninitialized,
            frames: 0,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn calibration(&self) -> Option<CalibrationConstants> {
        self.state.calibration()
    }

    pub fn strategy(&self) -> MatchingStrategy {
        self.estimator.strategy()
    }

    pub fn encoding(&self) -> DepthEncoding {
        self.encoding
    }

    /// Frames processed so far
    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Start the camera streams and take its calibration
    pub fn start(&mut self) -> DepthResult<CalibrationConstants> {
        if self.state != SessionState::Uninitialized {
            return Err(DepthError::InvalidState {
                operation: "start",
                state: self.state.name(),
            });
        }

        match self.start_camera() {
            Ok(calibration) => {
                info!(
                    camera = self.camera.name(),
                    strategy = %self.estimator.strategy(),
                    focal_length = calibration.focal_length,
                    baseline = calibration.baseline,
                    depth_units = calibration.depth_units,
                    "Depth session started"
                );
                self.state = SessionState::Started(calibration);
                Ok(calibration)
            }
            Err(e) => {
                warn!(camera = self.camera.name(), error = %e, "Failed to start depth session");
                self.camera.stop();
                self.state = SessionState::Stopped;
                Err(e)
            }
        }
    }

    fn start_camera(&mut self) -> DepthResult<CalibrationConstants> {
        let calibration = self.camera.start(&self.streams)?;
        // Fail at start rather than on the first frame
        DepthConverter::new(calibration, self.encoding)?;
        Ok(calibration)
    }

    /// Run one capture, estimate, convert and publish cycle
    pub fn update(&mut self) -> DepthResult<FrameSummary> {
        let Some(calibration) = self.state.calibration() else {
            return Err(DepthError::InvalidState {
                operation: "update",
                state: self.state.name(),
            });
        };

        let pair = match self.camera.pull_frame_pair() {
            Ok(pair) => pair,
            Err(e) => {
                if e == CaptureError::EndOfStream {
                    info!(camera = self.camera.name(), "End of stream, stopping session");
                } else {
                    warn!(
                        camera = self.camera.name(),
                        error = %e,
                        "Capture failed, stopping session"
                    );
                }
                self.camera.stop();
                self.state = SessionState::Stopped;
                return Err(e.into());
            }
        };

        let started = Instant::now();
        let converter = DepthConverter::new(calibration, self.encoding)?;
        let disparity = self.estimator.compute(pair.left(), pair.right())?;
        let depth = converter.convert(&disparity)?;
        let elapsed = started.elapsed();

        self.publish(&pair, &depth);
        self.state = SessionState::Running(calibration);
        self.frames += 1;

        let (width, height) = depth.dimensions();
        let summary = FrameSummary {
            frame_number: pair.frame_number(),
            width,
            height,
            valid_pixels: depth.valid_count(),
            depth_range: depth.valid_range(),
            elapsed,
        };

        debug!(
            frame = summary.frame_number,
            valid = summary.valid_pixels,
            elapsed_ms = elapsed.as_millis() as u64,
            "Frame processed"
        );
        if self.frames % FRAME_LOG_INTERVAL == 0 {
            info!(frames = self.frames, "Depth session progress");
        }

        Ok(summary)
    }

    fn publish(&mut self, pair: &FramePair, depth: &DepthMap) {
        let z16 = depth.to_z16();
        self.sink.publish(SinkBuffer::Depth(&z16), ChannelId::COMPUTED_DEPTH);
        if let Some(hardware) = pair.hardware_depth() {
            self.sink.publish(SinkBuffer::Depth(hardware), ChannelId::HARDWARE_DEPTH);
        }
        self.sink.publish(SinkBuffer::Intensity(pair.left()), ChannelId::LEFT_INFRARED);
        self.sink.publish(SinkBuffer::Intensity(pair.right()), ChannelId::RIGHT_INFRARED);

        if let Some(options) = &self.preview {
            let rgba = depth_to_rgba(depth, options);
            let (width, height) = depth.dimensions();
            self.sink.publish(
                SinkBuffer::Rgba8 {
                    width,
                    height,
                    data: &rgba,
                },
                ChannelId::DEPTH_PREVIEW,
            );
        }
    }

    /// Release the camera; safe to call any number of times
    pub fn stop(&mut self) {
        match self.state {
            SessionState::Started(_) | SessionState::Running(_) => {
                self.camera.stop();
                info!(
                    camera = self.camera.name(),
                    frames = self.frames,
                    "Depth session stopped"
                );
            }
            SessionState::Uninitialized => debug!("Depth session stopped before start"),
            SessionState::Stopped => debug!("Depth session already stopped"),
        }
        self.state = SessionState::Stopped;
    }
}

impl<C: CameraSession, S: Sink> Drop for DepthSession<C, S> {
    fn drop(&mut self) {
        if self.state.is_live() {
            self.stop();
        }
    }
}
