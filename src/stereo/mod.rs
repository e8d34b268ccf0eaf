// SPDX-License-Identifier: GPL-3.0-only

//! Disparity estimation from rectified stereo pairs
//!
//! Two matching strategies are available. They produce different quantities:
//!
//! - [`MatchingStrategy::NearestIntensity`]: per-pixel search for the right
//!   image sample closest in intensity. The map holds the best intensity
//!   *cost*, not the column where it was found
//!   ([`DisparityKind::MatchingCost`]).
//! - [`MatchingStrategy::BlockMatching`]: sum-of-absolute-differences over a
//!   square window. The map holds a true pixel shift
//!   ([`DisparityKind::PixelShift`]).
//!
//! # Rayon
//!
//! With the `rayon` feature rows are processed in parallel. Each output cell
//! only reads the two input images, so results are identical either way.

mod block_matching;
mod nearest_intensity;

use crate::constants::matching::{
    DEFAULT_BLOCK_SIZE, DEFAULT_MAX_OFFSET, DEFAULT_NUM_DISPARITIES,
};
use crate::errors::PreconditionError;
use crate::frame::{DisparityKind, DisparityMap, Grid, IntensityImage};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Matching strategy and its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchingStrategy {
    /// Per-pixel nearest-intensity search over `max_offset` columns to the right
    NearestIntensity { max_offset: usize },
    /// Square window SAD search over `num_disparities` offsets to the left
    BlockMatching {
        block_size: usize,
        num_disparities: usize,
    },
}

impl Default for MatchingStrategy {
    fn default() -> Self {
        Self::block_matching()
    }
}

impl MatchingStrategy {
    /// Nearest-intensity search with the default search width
    pub fn nearest_intensity() -> Self {
        MatchingStrategy::NearestIntensity {
            max_offset: DEFAULT_MAX_OFFSET,
        }
    }

    /// Block matching with the default window and search range
    pub fn block_matching() -> Self {
        MatchingStrategy::BlockMatching {
            block_size: DEFAULT_BLOCK_SIZE,
            num_disparities: DEFAULT_NUM_DISPARITIES,
        }
    }

    /// Kind of values this strategy writes into its disparity map
    pub fn output_kind(&self) -> DisparityKind {
        match self {
            MatchingStrategy::NearestIntensity { .. } => DisparityKind::MatchingCost,
            MatchingStrategy::BlockMatching { .. } => DisparityKind::PixelShift,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MatchingStrategy::NearestIntensity { .. } => "nearest-intensity",
            MatchingStrategy::BlockMatching { .. } => "block-matching",
        }
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), PreconditionError> {
        match *self {
            MatchingStrategy::NearestIntensity { max_offset } => {
                if max_offset == 0 {
                    return Err(PreconditionError::InvalidParameter(
                        "max_offset must be at least 1".to_string(),
                    ));
                }
            }
            MatchingStrategy::BlockMatching {
                block_size,
                num_disparities,
            } => {
                if block_size == 0 || block_size % 2 == 0 {
                    return Err(PreconditionError::InvalidParameter(format!(
                        "block_size must be a positive odd number, got {}",
                        block_size
                    )));
                }
                if num_disparities == 0 {
                    return Err(PreconditionError::InvalidParameter(
                        "num_disparities must be at least 1".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for MatchingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchingStrategy::NearestIntensity { max_offset } => {
                write!(f, "nearest-intensity (max offset {})", max_offset)
            }
            MatchingStrategy::BlockMatching {
                block_size,
                num_disparities,
            } => write!(
                f,
                "block-matching ({}x{} window, {} disparities)",
                block_size, block_size, num_disparities
            ),
        }
    }
}

/// Computes disparity maps with a fixed strategy
#[derive(Debug, Clone)]
pub struct DisparityEstimator {
    strategy: MatchingStrategy,
}

impl DisparityEstimator {
    /// Create an estimator, rejecting out-of-range strategy parameters
    pub fn new(strategy: MatchingStrategy) -> Result<Self, PreconditionError> {
        strategy.validate()?;
        Ok(Self { strategy })
    }

    pub fn strategy(&self) -> MatchingStrategy {
        self.strategy
    }

    /// Compute the disparity map of a stereo pair
    ///
    /// Fails before any computation if the images are empty or differ in size.
    /// The returned map always has the dimensions of the inputs.
    pub fn compute(
        &self,
        left: &IntensityImage,
        right: &IntensityImage,
    ) -> Result<DisparityMap, PreconditionError> {
        check_inputs(left, right)?;

        let start = Instant::now();
        let map = match self.strategy {
            MatchingStrategy::NearestIntensity { max_offset } => {
                nearest_intensity::compute(left, right, max_offset)
            }
            MatchingStrategy::BlockMatching {
                block_size,
                num_disparities,
            } => block_matching::compute(left, right, block_size, num_disparities),
        };

        debug!(
            strategy = self.strategy.name(),
            width = map.width(),
            height = map.height(),
            valid = map.valid_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Disparity map computed"
        );

        Ok(map)
    }
}

/// Reject empty or differently sized stereo inputs
pub fn check_inputs(
    left: &IntensityImage,
    right: &IntensityImage,
) -> Result<(), PreconditionError> {
    if left.dimensions() != right.dimensions() {
        return Err(PreconditionError::DimensionMismatch {
            left: left.dimensions(),
            right: right.dimensions(),
        });
    }
    if left.is_empty() {
        return Err(PreconditionError::EmptyImage);
    }
    Ok(())
}

/// Absolute difference of two samples, computed on widened values
#[inline]
pub(crate) fn abs_diff(a: u16, b: u16) -> f64 {
    (f64::from(a) - f64::from(b)).abs()
}

/// Run `f(row, cells)` over every row of a non-empty grid
#[cfg(feature = "rayon")]
pub(crate) fn for_each_row<T, F>(grid: &mut Grid<T>, f: F)
where
    T: Copy + Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    use rayon::prelude::*;

    let width = grid.width();
    grid.as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, cells)| f(row, cells));
}

/// Run `f(row, cells)` over every row of a non-empty grid
#[cfg(not(feature = "rayon"))]
pub(crate) fn for_each_row<T, F>(grid: &mut Grid<T>, f: F)
where
    T: Copy + Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    let width = grid.width();
    grid.as_mut_slice()
        .chunks_mut(width)
        .enumerate()
        .for_each(|(row, cells)| f(row, cells));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatched_dimensions_rejected() {
        let estimator = DisparityEstimator::new(MatchingStrategy::block_matching()).unwrap();
        let left = IntensityImage::filled(8, 4, 10);
        let right = IntensityImage::filled(8, 5, 10);

        let err = estimator.compute(&left, &right).unwrap_err();
        assert_eq!(
            err,
            PreconditionError::DimensionMismatch {
                left: (8, 4),
                right: (8, 5)
            }
        );
    }

    #[test]
    fn test_empty_images_rejected() {
        let estimator = DisparityEstimator::new(MatchingStrategy::nearest_intensity()).unwrap();
        let left = IntensityImage::filled(0, 4, 0);
        let right = IntensityImage::filled(0, 4, 0);

        assert_eq!(
            estimator.compute(&left, &right).unwrap_err(),
            PreconditionError::EmptyImage
        );
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let even_block = MatchingStrategy::BlockMatching {
            block_size: 4,
            num_disparities: 16,
        };
        assert!(DisparityEstimator::new(even_block).is_err());

        let no_disparities = MatchingStrategy::BlockMatching {
            block_size: 3,
            num_disparities: 0,
        };
        assert!(DisparityEstimator::new(no_disparities).is_err());

        let no_offset = MatchingStrategy::NearestIntensity { max_offset: 0 };
        assert!(DisparityEstimator::new(no_offset).is_err());
    }

    #[test]
    fn test_output_kind_follows_strategy() {
        let left = IntensityImage::filled(6, 6, 3);
        let right = IntensityImage::filled(6, 6, 3);

        for strategy in [
            MatchingStrategy::NearestIntensity { max_offset: 4 },
            MatchingStrategy::BlockMatching {
                block_size: 3,
                num_disparities: 2,
            },
        ] {
            let map = DisparityEstimator::new(strategy)
                .unwrap()
                .compute(&left, &right)
                .unwrap();
            assert_eq!(map.kind(), strategy.output_kind());
            assert_eq!(map.dimensions(), (6, 6));
        }
    }

    #[test]
    fn test_abs_diff_does_not_wrap() {
        assert_eq!(abs_diff(3, 250), 247.0);
        assert_eq!(abs_diff(250, 3), 247.0);
        assert_eq!(abs_diff(0, u16::MAX), 65535.0);
    }

    #[test]
    fn test_strategy_serde_tagging() {
        let strategy = MatchingStrategy::NearestIntensity { max_offset: 16 };
        let json = serde_json::to_string(&strategy).unwrap();
        assert_eq!(json, r#"{"kind":"nearest_intensity","max_offset":16}"#);

        let parsed: MatchingStrategy =
            serde_json::from_str(r#"{"kind":"block_matching","block_size":5,"num_disparities":32}"#)
                .unwrap();
        assert_eq!(
            parsed,
            MatchingStrategy::BlockMatching {
                block_size: 5,
                num_disparities: 32
            }
        );
    }
}
