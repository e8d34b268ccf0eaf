// SPDX-License-Identifier: GPL-3.0-only

//! Fixed-size block matching
//!
//! The window of side `block_size` centered at `(row, col)` in the left image
//! is compared against the windows centered at `(row, col - d)` in the right
//! image for `d` in `0..num_disparities`. The offset with the lowest sum of
//! absolute differences wins; ties go to the smallest offset.
//!
//! A pixel is only matched when the left window and every right window of
//! the search range lie inside the image. All other pixels get
//! [`INVALID_DISPARITY`](crate::constants::matching::INVALID_DISPARITY).
//!
//! Window costs for one offset are read from a summed-area table of the
//! absolute difference image, so the block size does not affect run time.

use super::{abs_diff, for_each_row};
use crate::constants::matching::INVALID_DISPARITY;
use crate::frame::{DisparityKind, DisparityMap, Grid, IntensityImage};
use std::ops::Range;
use tracing::debug;

/// Best match so far for one pixel
#[derive(Debug, Clone, Copy)]
struct BestMatch {
    cost: f64,
    offset: Option<usize>,
}

impl BestMatch {
    const NONE: BestMatch = BestMatch {
        cost: f64::INFINITY,
        offset: None,
    };
}

pub(super) fn compute(
    left: &IntensityImage,
    right: &IntensityImage,
    block_size: usize,
    num_disparities: usize,
) -> DisparityMap {
    let (width, height) = left.dimensions();
    let half = block_size / 2;

    let rows = half..height.saturating_sub(half);
    // First column whose whole search range is in bounds
    let first_col = half.saturating_add(num_disparities - 1);
    let cols = first_col..width.saturating_sub(half);
    if rows.is_empty() || cols.is_empty() {
        debug!(
            width,
            height,
            block_size,
            num_disparities,
            "Search window exceeds image, no pixel matched"
        );
        return DisparityMap::invalid(width, height, DisparityKind::PixelShift);
    }

    let mut best = Grid::filled(width, height, BestMatch::NONE);
    let mut table = SummedAreaTable::new(width, height);

    for offset in 0..num_disparities {
        table.fill_abs_diff(left, right, offset);
        update_best(&table, &mut best, &rows, &cols, half, offset);
    }

    let disparities = best.map(|m| match m.offset {
        Some(offset) => offset as f32,
        None => INVALID_DISPARITY,
    });
    DisparityMap::new(disparities, DisparityKind::PixelShift)
}

/// Fold the window costs of one offset into the running minimum
fn update_best(
    table: &SummedAreaTable,
    best: &mut Grid<BestMatch>,
    rows: &Range<usize>,
    cols: &Range<usize>,
    half: usize,
    offset: usize,
) {
    for_each_row(best, |row, cells| {
        if !rows.contains(&row) {
            return;
        }
        for col in cols.clone() {
            let cost = table.window_sum(row - half, col - half, row + half, col + half);
            let cell = &mut cells[col];
            // Strict comparison keeps the smallest offset on ties
            if cost < cell.cost {
                *cell = BestMatch {
                    cost,
                    offset: Some(offset),
                };
            }
        }
    });
}

/// Summed-area table of `|L(r, c) - R(r, c - offset)|`
///
/// Columns left of `offset` have no right counterpart and contribute zero;
/// valid windows never reach them.
struct SummedAreaTable {
    stride: usize,
    height: usize,
    sums: Vec<f64>,
}

impl SummedAreaTable {
    fn new(width: usize, height: usize) -> Self {
        let stride = width + 1;
        Self {
            stride,
            height,
            sums: vec![0.0; stride * (height + 1)],
        }
    }

    fn fill_abs_diff(&mut self, left: &IntensityImage, right: &IntensityImage, offset: usize) {
        let stride = self.stride;
        for row in 0..self.height {
            let left_row = left.row(row);
            let right_row = right.row(row);
            let mut running = 0.0;
            for col in 0..left_row.len() {
                if col >= offset {
                    running += abs_diff(left_row[col], right_row[col - offset]);
                }
                let idx = (row + 1) * stride + col + 1;
                self.sums[idx] = self.sums[idx - stride] + running;
            }
        }
    }

    /// Sum over the inclusive rectangle `[top, bottom] x [left, right]`
    #[inline]
    fn window_sum(&self, top: usize, left: usize, bottom: usize, right: usize) -> f64 {
        let s = self.stride;
        self.sums[(bottom + 1) * s + right + 1] - self.sums[top * s + right + 1]
            - self.sums[(bottom + 1) * s + left]
            + self.sums[top * s + left]
    }
}
