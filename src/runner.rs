// SPDX-License-Identifier: GPL-3.0-only

//! Driving a session to completion
//!
//! [`RunMode::Once`] processes a single frame. [`RunMode::Loop`] processes
//! frames until the interrupt flag is raised, the frame bound is reached or
//! the source runs out of frames. Both stop the session before returning.

use crate::backends::CameraSession;
use crate::errors::{CaptureError, DepthError, DepthResult};
use crate::session::{DepthSession, FrameSummary};
use crate::sinks::Sink;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// How many cycles a run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// start, one update, stop
    #[default]
    Once,
    /// start, update until interrupted, stop
    Loop,
}

/// What a run did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Frames processed
    pub frames: u64,
    /// Stopped by the interrupt flag
    pub interrupted: bool,
    /// Stopped because the source had no more frames
    pub end_of_stream: bool,
    /// Summary of the last processed frame
    pub last: Option<FrameSummary>,
}

/// Register a Ctrl+C handler raising the returned flag
///
/// Can only be installed once per process.
pub fn install_interrupt_handler() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;
    Ok(stop_flag)
}

/// Start `session`, run it in `mode` and stop it
///
/// The interrupt flag is checked between cycles, so a cycle in progress
/// always completes. In loop mode running out of frames ends the run
/// normally. Every other error stops the session and is returned.
pub fn run<C: CameraSession, S: Sink>(
    session: &mut DepthSession<C, S>,
    mode: RunMode,
    max_frames: Option<u64>,
    interrupt: &AtomicBool,
) -> DepthResult<RunReport> {
    session.start()?;

    let result = match mode {
        RunMode::Once => session.update().map(|summary| RunReport {
            frames: 1,
            last: Some(summary),
            ..Default::default()
        }),
        RunMode::Loop => run_loop(session, max_frames, interrupt),
    };

    session.stop();

    if let Ok(report) = &result {
        info!(
            frames = report.frames,
            interrupted = report.interrupted,
            end_of_stream = report.end_of_stream,
            "Run finished"
        );
    }
    result
}

fn run_loop<C: CameraSession, S: Sink>(
    session: &mut DepthSession<C, S>,
    max_frames: Option<u64>,
    interrupt: &AtomicBool,
) -> DepthResult<RunReport> {
    let mut report = RunReport::default();

    loop {
        if interrupt.load(Ordering::SeqCst) {
            debug!("Interrupt received");
            report.interrupted = true;
            break;
        }
        if max_frames.is_some_and(|max| report.frames >= max) {
            break;
        }

        match session.update() {
            Ok(summary) => {
                report.frames += 1;
                report.last = Some(summary);
            }
            Err(DepthError::Capture(CaptureError::EndOfStream)) => {
                report.end_of_stream = true;
                break;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryCameraSession;
    use crate::depth::CalibrationConstants;
    use crate::frame::{FramePair, IntensityImage};
    use crate::session::{SessionOptions, SessionState};
    use crate::sinks::RecordingSink;
    use crate::stereo::MatchingStrategy;

    fn session(frames: u64) -> DepthSession<MemoryCameraSession, RecordingSink> {
        let pairs = (0..frames).map(|n| {
            let image = IntensityImage::filled(8, 8, n as u16);
            FramePair::new(n, image.clone(), image, None).unwrap()
        });
        DepthSession::new(
            MemoryCameraSession::new(CalibrationConstants::new(600.0, 50.0, 0.001), pairs),
            RecordingSink::new(),
            SessionOptions {
                strategy: MatchingStrategy::NearestIntensity { max_offset: 4 },
                ..SessionOptions::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_once_processes_single_frame() {
        let mut session = session(3);
        let report = run(&mut session, RunMode::Once, None, &AtomicBool::new(false)).unwrap();

        assert_eq!(report.frames, 1);
        assert_eq!(report.last.unwrap().frame_number, 0);
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.camera().remaining(), 2);
    }

    #[test]
    fn test_loop_until_end_of_stream() {
        let mut session = session(3);
        let report = run(&mut session, RunMode::Loop, None, &AtomicBool::new(false)).unwrap();

        assert_eq!(report.frames, 3);
        assert!(report.end_of_stream);
        assert!(!report.interrupted);
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn test_loop_respects_max_frames() {
        let mut session = session(5);
        let report = run(&mut session, RunMode::Loop, Some(2), &AtomicBool::new(false)).unwrap();
        assert_eq!(report.frames, 2);
        assert!(!report.end_of_stream);
        assert_eq!(session.camera().stop_count(), 1);
    }

    #[test]
    fn test_raised_interrupt_stops_before_first_cycle() {
        let mut session = session(5);
        let report = run(&mut session, RunMode::Loop, None, &AtomicBool::new(true)).unwrap();

        assert_eq!(report.frames, 0);
        assert!(report.interrupted);
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.camera().stop_count(), 1);
    }

    #[test]
    fn test_once_completes_cycle_when_interrupted() {
        let mut session = session(2);
        let report = run(&mut session, RunMode::Once, None, &AtomicBool::new(true)).unwrap();

        assert_eq!(report.frames, 1);
        assert!(!report.interrupted);
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.camera().stop_count(), 1);
    }

    #[test]
    fn test_once_without_frames_is_an_error() {
        let mut session = session(0);
        let err = run(&mut session, RunMode::Once, None, &AtomicBool::new(false)).unwrap_err();
        assert_eq!(err, DepthError::Capture(CaptureError::EndOfStream));
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn test_run_mode_serde() {
        assert_eq!(serde_json::to_string(&RunMode::Loop).unwrap(), "\"loop\"");
    }
}
