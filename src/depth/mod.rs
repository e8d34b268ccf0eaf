// SPDX-License-Identifier: GPL-3.0-only

//! Disparity to depth conversion
//!
//! Each disparity kind has its own formula and the converter refuses to
//! apply one to the other:
//!
//! - [`DepthEncoding::Metric`] triangulates pixel shifts:
//!   `depth = (focal_length * baseline) / (depth_units * quantization_factor * d)`
//! - [`DepthEncoding::InverseCost`] maps matching costs to a display scale:
//!   `depth = scale / (cost + 1)`
//!
//! Cells without a usable disparity get depth `0.0`.

pub mod visualization;

use crate::constants::conversion::{DEFAULT_COST_SCALE, DEFAULT_QUANTIZATION_FACTOR, NO_DEPTH};
use crate::errors::PreconditionError;
use crate::frame::{DepthMap, DisparityKind, DisparityMap, is_valid_disparity};
use serde::{Deserialize, Serialize};

/// Optical constants of a stereo session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConstants {
    /// Focal length in pixels
    pub focal_length: f64,
    /// Distance between the two sensors
    pub baseline: f64,
    /// Length represented by one raw depth unit
    pub depth_units: f64,
}

impl CalibrationConstants {
    pub fn new(focal_length: f64, baseline: f64, depth_units: f64) -> Self {
        Self {
            focal_length,
            baseline,
            depth_units,
        }
    }

    /// Check that every constant is finite and positive
    pub fn validate(&self) -> Result<(), PreconditionError> {
        for (name, value) in [
            ("focal_length", self.focal_length),
            ("baseline", self.baseline),
            ("depth_units", self.depth_units),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PreconditionError::InvalidParameter(format!(
                    "{} must be finite and positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Formula used to turn a disparity map into depth
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DepthEncoding {
    /// Triangulation of [`DisparityKind::PixelShift`] maps
    Metric { quantization_factor: f64 },
    /// Display scaling of [`DisparityKind::MatchingCost`] maps
    InverseCost { scale: f64 },
}

impl DepthEncoding {
    /// Metric triangulation with the block matching fixed-point factor
    pub fn metric() -> Self {
        DepthEncoding::Metric {
            quantization_factor: DEFAULT_QUANTIZATION_FACTOR,
        }
    }

    /// Inverse cost with the default display scale
    pub fn inverse_cost() -> Self {
        DepthEncoding::InverseCost {
            scale: DEFAULT_COST_SCALE,
        }
    }

    /// Formula belonging to a disparity kind
    pub fn for_kind(kind: DisparityKind, quantization_factor: f64, cost_scale: f64) -> Self {
        match kind {
            DisparityKind::PixelShift => DepthEncoding::Metric {
                quantization_factor,
            },
            DisparityKind::MatchingCost => DepthEncoding::InverseCost { scale: cost_scale },
        }
    }

    /// Disparity kind this formula accepts
    pub fn input_kind(&self) -> DisparityKind {
        match self {
            DepthEncoding::Metric { .. } => DisparityKind::PixelShift,
            DepthEncoding::InverseCost { .. } => DisparityKind::MatchingCost,
        }
    }

    fn validate(&self) -> Result<(), PreconditionError> {
        let (name, value) = match *self {
            DepthEncoding::Metric {
                quantization_factor,
            } => ("quantization_factor", quantization_factor),
            DepthEncoding::InverseCost { scale } => ("cost_scale", scale),
        };
        if !value.is_finite() || value <= 0.0 {
            return Err(PreconditionError::InvalidParameter(format!(
                "{} must be finite and positive, got {}",
                name, value
            )));
        }
        Ok(())
    }
}

/// Converts disparity maps of one kind into depth maps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthConverter {
    calibration: CalibrationConstants,
    encoding: DepthEncoding,
}

impl DepthConverter {
    pub fn new(
        calibration: CalibrationConstants,
        encoding: DepthEncoding,
    ) -> Result<Self, PreconditionError> {
        encoding.validate()?;
        if let DepthEncoding::Metric { .. } = encoding {
            calibration.validate()?;
        }
        Ok(Self {
            calibration,
            encoding,
        })
    }

    pub fn calibration(&self) -> CalibrationConstants {
        self.calibration
    }

    pub fn encoding(&self) -> DepthEncoding {
        self.encoding
    }

    /// Convert a disparity map, keeping its dimensions
    ///
    /// Pure and deterministic: the same map always yields the same depth.
    pub fn convert(&self, disparity: &DisparityMap) -> Result<DepthMap, PreconditionError> {
        let expected = self.encoding.input_kind();
        if disparity.kind() != expected {
            return Err(PreconditionError::EncodingMismatch {
                expected: expected.name(),
                actual: disparity.kind().name(),
            });
        }

        let depth = match self.encoding {
            DepthEncoding::Metric {
                quantization_factor,
            } => {
                let numerator = self.calibration.focal_length * self.calibration.baseline;
                let units = self.calibration.depth_units * quantization_factor;
                disparity
                    .grid()
                    .map(|d| metric_depth(f64::from(d), numerator, units, is_valid_disparity(d)))
            }
            DepthEncoding::InverseCost { scale } => disparity
                .grid()
                .map(|cost| inverse_cost_depth(f64::from(cost), scale, is_valid_disparity(cost))),
        };

        Ok(DepthMap::new(depth))
    }
}

/// `numerator / (units * d)` for a positive valid disparity, else no depth
#[inline]
fn metric_depth(disparity: f64, numerator: f64, units: f64, valid: bool) -> f64 {
    if !valid || disparity <= 0.0 {
        return NO_DEPTH;
    }
    numerator / (units * disparity)
}

/// `scale / (cost + 1)` for a valid non-negative cost, else no depth
///
/// A zero cost is a perfect match and maps to `scale`.
#[inline]
fn inverse_cost_depth(cost: f64, scale: f64, valid: bool) -> f64 {
    if !valid || cost < 0.0 {
        return NO_DEPTH;
    }
    scale / (cost + 1.0)
}
