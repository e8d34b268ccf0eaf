// SPDX-License-Identifier: GPL-3.0-only

//! Frame pair and per-pixel map types
//!
//! All maps are row-major grids. A [`FramePair`] can only be built fully
//! populated and with matching dimensions, so everything derived from it
//! inherits the same width and height.

use crate::constants::conversion::NO_DEPTH;
use crate::constants::matching::INVALID_DISPARITY;
use crate::errors::PreconditionError;

/// Row-major 2-D buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Copy> Grid<T> {
    /// Create a grid with every cell set to `value`
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Wrap a row-major buffer, rejecting a length that is not `width * height`
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self, PreconditionError> {
        let expected = width * height;
        if data.len() != expected {
            return Err(PreconditionError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a grid by evaluating `f(row, col)` for every cell
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// True if either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Sample at `(row, col)`; panics when out of bounds
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.width + col] = value;
    }

    pub fn row(&self, row: usize) -> &[T] {
        let start = row * self.width;
        &self.data[start..start + self.width]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Apply `f` to every cell, keeping the dimensions
    pub fn map<U: Copy>(&self, f: impl FnMut(T) -> U) -> Grid<U> {
        Grid {
            width: self.width,
            height: self.height,
            data: self.data.iter().copied().map(f).collect(),
        }
    }
}

/// Infrared intensity image, 8-bit sensors are stored widened
pub type IntensityImage = Grid<u16>;

impl Grid<u16> {
    /// Build an intensity image from 8-bit samples
    pub fn from_y8(width: usize, height: usize, samples: &[u8]) -> Result<Self, PreconditionError> {
        Self::from_vec(width, height, samples.iter().map(|&s| u16::from(s)).collect())
    }

    /// Samples narrowed to 8 bits, saturating
    pub fn to_y8(&self) -> Vec<u8> {
        self.data.iter().map(|&s| s.min(255) as u8).collect()
    }

    /// True if every sample fits in 8 bits
    pub fn fits_y8(&self) -> bool {
        self.data.iter().all(|&s| s <= 255)
    }
}

/// What the values of a [`DisparityMap`] mean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisparityKind {
    /// Best absolute intensity difference found by the nearest-intensity search.
    /// Not a pixel shift.
    MatchingCost,
    /// Horizontal offset in pixels found by block matching
    PixelShift,
}

impl DisparityKind {
    pub fn name(&self) -> &'static str {
        match self {
            DisparityKind::MatchingCost => "matching-cost",
            DisparityKind::PixelShift => "pixel-shift",
        }
    }
}

impl std::fmt::Display for DisparityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Per-pixel disparity, or [`INVALID_DISPARITY`] where no match was found
#[derive(Debug, Clone, PartialEq)]
pub struct DisparityMap {
    grid: Grid<f32>,
    kind: DisparityKind,
}

impl DisparityMap {
    pub fn new(grid: Grid<f32>, kind: DisparityKind) -> Self {
        Self { grid, kind }
    }

    /// A map with every cell invalid
    pub fn invalid(width: usize, height: usize, kind: DisparityKind) -> Self {
        Self::new(Grid::filled(width, height, INVALID_DISPARITY), kind)
    }

    pub fn kind(&self) -> DisparityKind {
        self.kind
    }

    pub fn grid(&self) -> &Grid<f32> {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid<f32> {
        &mut self.grid
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.grid.dimensions()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.grid.get(row, col)
    }

    /// True unless the cell holds the invalid sentinel
    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        is_valid_disparity(self.get(row, col))
    }

    pub fn valid_count(&self) -> usize {
        self.grid
            .as_slice()
            .iter()
            .filter(|&&d| is_valid_disparity(d))
            .count()
    }
}

/// True unless `value` is the invalid sentinel
#[inline]
pub fn is_valid_disparity(value: f32) -> bool {
    value != INVALID_DISPARITY
}

/// Per-pixel depth, `0.0` where no depth could be computed
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    grid: Grid<f64>,
}

impl DepthMap {
    pub fn new(grid: Grid<f64>) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &Grid<f64> {
        &self.grid
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.grid.dimensions()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.grid.get(row, col)
    }

    /// Number of cells holding a depth
    pub fn valid_count(&self) -> usize {
        self.grid.as_slice().iter().filter(|&&d| d > NO_DEPTH).count()
    }

    /// Smallest and largest valid depth, `None` if no cell holds one
    pub fn valid_range(&self) -> Option<(f64, f64)> {
        self.grid
            .as_slice()
            .iter()
            .copied()
            .filter(|&d| d > NO_DEPTH)
            .fold(None, |acc, d| match acc {
                None => Some((d, d)),
                Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
            })
    }

    /// Depth in 16-bit storage width
    ///
    /// Values are rounded and clamped to `0..=u16::MAX` here and nowhere
    /// earlier in the pipeline.
    pub fn to_z16(&self) -> Grid<u16> {
        self.grid.map(|d| {
            if d.is_nan() {
                0
            } else {
                d.round().clamp(0.0, f64::from(u16::MAX)) as u16
            }
        })
    }
}

/// Left and right infrared images plus optional hardware depth of one capture instant
#[derive(Debug, Clone)]
pub struct FramePair {
    frame_number: u64,
    left: IntensityImage,
    right: IntensityImage,
    hardware_depth: Option<Grid<u16>>,
}

impl FramePair {
    /// Assemble a frame pair, rejecting members whose dimensions differ
    pub fn new(
        frame_number: u64,
        left: IntensityImage,
        right: IntensityImage,
        hardware_depth: Option<Grid<u16>>,
    ) -> Result<Self, PreconditionError> {
        if left.dimensions() != right.dimensions() {
            return Err(PreconditionError::DimensionMismatch {
                left: left.dimensions(),
                right: right.dimensions(),
            });
        }
        if let Some(depth) = &hardware_depth {
            if depth.dimensions() != left.dimensions() {
                return Err(PreconditionError::DimensionMismatch {
                    left: left.dimensions(),
                    right: depth.dimensions(),
                });
            }
        }
        Ok(Self {
            frame_number,
            left,
            right,
            hardware_depth,
        })
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn left(&self) -> &IntensityImage {
        &self.left
    }

    pub fn right(&self) -> &IntensityImage {
        &self.right
    }

    pub fn hardware_depth(&self) -> Option<&Grid<u16>> {
        self.hardware_depth.as_ref()
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.left.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_from_vec_rejects_wrong_length() {
        let err = Grid::from_vec(3, 2, vec![0u16; 5]).unwrap_err();
        assert_eq!(
            err,
            PreconditionError::BufferSize {
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn test_grid_row_major_layout() {
        let grid = Grid::from_fn(3, 2, |row, col| (row * 10 + col) as u16);
        assert_eq!(grid.get(1, 2), 12);
        assert_eq!(grid.row(1), &[10, 11, 12]);
        assert_eq!(grid.dimensions(), (3, 2));
    }

    #[test]
    fn test_to_z16_clamps_at_boundary() {
        let values = vec![-3.0, 12.6, 93_750.0, f64::NAN];
        let depth = DepthMap::new(Grid::from_vec(4, 1, values).unwrap());
        assert_eq!(depth.to_z16().as_slice(), &[0, 13, u16::MAX, 0]);
    }

    #[test]
    fn test_valid_range_ignores_no_depth() {
        let depth = DepthMap::new(Grid::from_vec(4, 1, vec![0.0, 5.0, 2.0, 9.0]).unwrap());
        assert_eq!(depth.valid_range(), Some((2.0, 9.0)));
        assert_eq!(depth.valid_count(), 3);

        let empty = DepthMap::new(Grid::filled(2, 2, 0.0));
        assert_eq!(empty.valid_range(), None);
    }

    #[test]
    fn test_frame_pair_rejects_mismatched_depth() {
        let left = IntensityImage::filled(4, 4, 0);
        let right = IntensityImage::filled(4, 4, 0);
        let depth = Grid::filled(4, 3, 0u16);
        assert!(FramePair::new(0, left, right, Some(depth)).is_err());
    }

    #[test]
    fn test_frame_pair_rejects_mismatched_images() {
        let left = IntensityImage::filled(4, 4, 0);
        let right = IntensityImage::filled(5, 4, 0);
        let err = FramePair::new(0, left, right, None).unwrap_err();
        assert!(matches!(err, PreconditionError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_disparity_validity() {
        let mut map = DisparityMap::invalid(2, 1, DisparityKind::PixelShift);
        map.grid_mut().set(0, 1, 3.0);
        assert!(!map.is_valid(0, 0));
        assert!(map.is_valid(0, 1));
        assert_eq!(map.valid_count(), 1);
    }
}
