// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the depth pipeline

use std::fmt;

/// Result type alias using DepthError
pub type DepthResult<T> = Result<T, DepthError>;

/// Main pipeline error type
#[derive(Debug, Clone, PartialEq)]
pub enum DepthError {
    /// Inputs rejected before any computation
    Precondition(PreconditionError),
    /// Camera session failure
    Capture(CaptureError),
    /// Configuration errors
    Config(ConfigError),
    /// Lifecycle operation not allowed in the current state
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

/// Degenerate or inconsistent inputs to the estimator or converter
#[derive(Debug, Clone, PartialEq)]
pub enum PreconditionError {
    /// Width or height is zero
    EmptyImage,
    /// Left and right (or hardware depth) dimensions differ
    DimensionMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
    /// Raw buffer length does not match width * height
    BufferSize { expected: usize, actual: usize },
    /// Strategy or encoding parameter out of range
    InvalidParameter(String),
    /// Disparity map kind does not match the configured depth formula
    EncodingMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Camera session errors
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// A requested stream is not provided by the session
    StreamUnavailable { stream: String },
    /// A frame of a stream could not be read or decoded
    FrameDecode { stream: String, reason: String },
    /// The frame source has no more frames
    EndOfStream,
    /// Calibration could not be established
    Calibration(String),
    /// Session used outside of start/stop
    NotStarted,
    /// Underlying I/O error
    Io(String),
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// File could not be read or written
    Io(String),
    /// File contents are not a valid configuration
    Parse(String),
}

/// Sink errors, logged by the sink itself and never returned to the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum SinkError {
    /// Buffer could not be encoded
    Encode(String),
    /// Output could not be written
    Io(String),
}

impl fmt::Display for DepthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepthError::Precondition(e) => write!(f, "Invalid input: {}", e),
            DepthError::Capture(e) => write!(f, "Capture error: {}", e),
            DepthError::Config(e) => write!(f, "Configuration error: {}", e),
            DepthError::InvalidState { operation, state } => {
                write!(f, "Cannot {} a session that is {}", operation, state)
            }
        }
    }
}

impl fmt::Display for PreconditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreconditionError::EmptyImage => write!(f, "image has zero width or height"),
            PreconditionError::DimensionMismatch { left, right } => write!(
                f,
                "image dimensions differ: {}x{} vs {}x{}",
                left.0, left.1, right.0, right.1
            ),
            PreconditionError::BufferSize { expected, actual } => write!(
                f,
                "buffer holds {} samples, expected {}",
                actual, expected
            ),
            PreconditionError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            PreconditionError::EncodingMismatch { expected, actual } => write!(
                f,
                "depth formula expects a {} map, got a {} map",
                expected, actual
            ),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::StreamUnavailable { stream } => {
                write!(f, "Stream unavailable: {}", stream)
            }
            CaptureError::FrameDecode { stream, reason } => {
                write!(f, "Failed to read {} frame: {}", stream, reason)
            }
            CaptureError::EndOfStream => write!(f, "No more frames"),
            CaptureError::Calibration(msg) => write!(f, "Calibration unavailable: {}", msg),
            CaptureError::NotStarted => write!(f, "Camera session not started"),
            CaptureError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Encode(msg) => write!(f, "Encoding failed: {}", msg),
            SinkError::Io(msg) => write!(f, "Write failed: {}", msg),
        }
    }
}

impl std::error::Error for DepthError {}
impl std::error::Error for PreconditionError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for SinkError {}

// Conversions from sub-errors to DepthError
impl From<PreconditionError> for DepthError {
    fn from(err: PreconditionError) -> Self {
        DepthError::Precondition(err)
    }
}

impl From<CaptureError> for DepthError {
    fn from(err: CaptureError) -> Self {
        DepthError::Capture(err)
    }
}

impl From<ConfigError> for DepthError {
    fn from(err: ConfigError) -> Self {
        DepthError::Config(err)
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::Io(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err.to_string())
    }
}

impl From<image::ImageError> for SinkError {
    fn from(err: image::ImageError) -> Self {
        SinkError::Encode(err.to_string())
    }
}
