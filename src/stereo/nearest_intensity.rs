// SPDX-License-Identifier: GPL-3.0-only

//! Per-pixel nearest-intensity search
//!
//! For each pixel the left sample is compared with the right sample at the
//! same position, then with the right samples in the columns
//! `col + 1 .. min(width - 1, col + max_offset)`. A candidate replaces the
//! current best only when strictly cheaper, so the earliest minimum is kept.
//!
//! The map stores the best absolute intensity difference. It is a matching
//! cost and not a column offset, even though it is consumed where a
//! disparity would be.

use super::{abs_diff, for_each_row};
use crate::frame::{DisparityKind, DisparityMap, Grid, IntensityImage};

pub(super) fn compute(
    left: &IntensityImage,
    right: &IntensityImage,
    max_offset: usize,
) -> DisparityMap {
    let mut costs = Grid::filled(left.width(), left.height(), 0.0f32);

    for_each_row(&mut costs, |row, cells| {
        let left_row = left.row(row);
        let right_row = right.row(row);
        for (col, cell) in cells.iter_mut().enumerate() {
            *cell = best_cost(left_row, right_row, col, max_offset) as f32;
        }
    });

    DisparityMap::new(costs, DisparityKind::MatchingCost)
}

/// Lowest intensity difference for `left_row[col]` within the search window
fn best_cost(left_row: &[u16], right_row: &[u16], col: usize, max_offset: usize) -> f64 {
    let target = left_row[col];
    let mut best = abs_diff(target, right_row[col]);

    // Exclusive upper bound, truncated at the last column
    let end = (right_row.len() - 1).min(col.saturating_add(max_offset));
    for candidate in (col + 1..end).map(|c| right_row[c]) {
        let cost = abs_diff(target, candidate);
        if cost < best {
            best = cost;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_image(samples: &[u16]) -> IntensityImage {
        Grid::from_vec(samples.len(), 1, samples.to_vec()).unwrap()
    }

    #[test]
    fn test_identical_rows_have_zero_cost() {
        let samples: Vec<u16> = (0..20).map(|i| (i * 7) as u16).collect();
        let map = compute(&row_image(&samples), &row_image(&samples), 16);

        assert!(map.grid().as_slice().iter().all(|&c| c == 0.0));
        assert_eq!(map.kind(), DisparityKind::MatchingCost);
    }

    #[test]
    fn test_search_finds_exact_match_to_the_right() {
        // left[5] also appears at column 9, inside the search window
        let mut left: Vec<u16> = (0..20).map(|i| (i * 10) as u16).collect();
        left[9] = left[5];
        let mut right = left.clone();
        right[5] = left[5] + 100;

        let map = compute(&row_image(&left), &row_image(&right), 16);
        assert_eq!(map.get(0, 5), 0.0);
    }

    #[test]
    fn test_keeps_initial_cost_without_strict_improvement() {
        // Every candidate right of column 5 is worse than the initial cost
        let mut left = vec![200u16; 20];
        left[5] = 0;
        let mut right = left.clone();
        right[5] = 100;

        let map = compute(&row_image(&left), &row_image(&right), 16);
        assert_eq!(map.get(0, 5), 100.0);
    }

    #[test]
    fn test_window_truncates_before_last_column() {
        // The only perfect match sits in the last column, which the window excludes
        let left = row_image(&[7, 0, 0, 0, 0]);
        let right = row_image(&[9, 100, 100, 100, 7]);
        let map = compute(&left, &right, 16);
        assert_eq!(map.get(0, 0), 2.0);
    }

    #[test]
    fn test_window_limited_by_max_offset() {
        // Matching sample at column 4 lies beyond col + max_offset
        let left = row_image(&[30, 0, 0, 0, 0, 0, 0, 0]);
        let right = row_image(&[80, 90, 90, 90, 30, 90, 90, 90]);

        assert_eq!(compute(&left, &right, 3).get(0, 0), 50.0);
        assert_eq!(compute(&left, &right, 5).get(0, 0), 0.0);
    }

    #[test]
    fn test_single_column_image() {
        let left = Grid::from_vec(1, 3, vec![1u16, 2, 3]).unwrap();
        let right = Grid::from_vec(1, 3, vec![4u16, 2, 0]).unwrap();
        let map = compute(&left, &right, 16);
        assert_eq!(map.grid().as_slice(), &[3.0, 0.0, 3.0]);
    }

    #[test]
    fn test_unbounded_max_offset_searches_to_row_end() {
        let left = row_image(&[7, 0, 0, 0, 0]);
        let right = row_image(&[9, 100, 7, 100, 100]);

        let unbounded = compute(&left, &right, usize::MAX);
        assert_eq!(unbounded, compute(&left, &right, 16));
        assert_eq!(unbounded.get(0, 0), 0.0);
    }
}
