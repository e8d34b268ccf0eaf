// SPDX-License-Identifier: GPL-3.0-only

//! Depth preview rendering
//!
//! Converts depth maps to RGBA for inspection:
//! - Turbo colormap (blue=near, red=far)
//! - Grayscale (bright=near, dark=far)

use crate::constants::preview::COLORMAP_BANDS;
use crate::frame::DepthMap;
use serde::{Deserialize, Serialize};

/// Preview rendering options
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PreviewOptions {
    /// Grayscale instead of the turbo colormap
    pub grayscale: bool,
    /// Quantize to bands for smoother visualization
    pub quantize: bool,
    /// Fixed `(near, far)` range, the valid range of each map if unset
    pub range: Option<(f64, f64)>,
}

/// Turbo colormap: perceptually uniform rainbow (blue=near, red=far)
///
/// Based on: https://ai.googleblog.com/2019/08/turbo-improved-rainbow-colormap-for.html
/// Simplified version with polynomial approximation.
#[inline]
fn turbo(t: f32) -> [u8; 4] {
    let r = (0.13572138
        + t * (4.6153926 + t * (-42.66032 + t * (132.13108 + t * (-152.54825 + t * 59.28144)))))
        .clamp(0.0, 1.0);
    let g = (0.09140261
        + t * (2.19418 + t * (4.84296 + t * (-14.18503 + t * (4.27805 + t * 2.53377)))))
        .clamp(0.0, 1.0);
    let b = (0.1066733
        + t * (12.64194 + t * (-60.58204 + t * (109.99648 + t * (-82.52904 + t * 20.43388)))))
        .clamp(0.0, 1.0);
    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8, 255]
}

/// Render a depth map as RGBA (4 bytes per pixel, row-major)
///
/// Cells without depth are black.
pub fn depth_to_rgba(depth: &DepthMap, options: &PreviewOptions) -> Vec<u8> {
    let samples = depth.grid().as_slice();
    let mut rgba = Vec::with_capacity(samples.len() * 4);

    let Some((near, far)) = options.range.or_else(|| depth.valid_range()) else {
        rgba.resize(samples.len() * 4, 0);
        for pixel in rgba.chunks_exact_mut(4) {
            pixel[3] = 255;
        }
        return rgba;
    };
    let span = (far - near).max(f64::EPSILON);

    for &d in samples {
        if d <= 0.0 || !d.is_finite() {
            rgba.extend_from_slice(&[0, 0, 0, 255]);
            continue;
        }

        let mut t = (((d - near) / span) as f32).clamp(0.0, 1.0);
        if options.quantize {
            t = (t * COLORMAP_BANDS).floor() / COLORMAP_BANDS;
        }

        if options.grayscale {
            let gray = ((1.0 - t) * 255.0) as u8;
            rgba.extend_from_slice(&[gray, gray, gray, 255]);
        } else {
            rgba.extend_from_slice(&turbo(t));
        }
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Grid;

    fn depth(values: Vec<f64>) -> DepthMap {
        let width = values.len();
        DepthMap::new(Grid::from_vec(width, 1, values).unwrap())
    }

    #[test]
    fn test_depth_invalid() {
        let rgba = depth_to_rgba(&depth(vec![0.0; 4]), &PreviewOptions::default());
        assert_eq!(rgba.len(), 16);
        for chunk in rgba.chunks(4) {
            assert_eq!(chunk, &[0, 0, 0, 255]);
        }
    }

    #[test]
    fn test_depth_grayscale() {
        let options = PreviewOptions {
            grayscale: true,
            ..Default::default()
        };
        let rgba = depth_to_rgba(&depth(vec![400.0, 4000.0, 0.0]), &options);
        // Near should be bright, far dark, missing black
        assert!(rgba[0] > 200);
        assert!(rgba[4] < 50);
        assert_eq!(&rgba[8..12], &[0, 0, 0, 255]);
    }

    #[test]
    fn test_turbo_colormap() {
        let start = turbo(0.0);
        let mid = turbo(0.5);
        let end = turbo(1.0);

        assert_ne!(start, mid);
        assert_ne!(mid, end);
        // Far end is redder than the near end
        assert!(end[0] > start[0]);
    }

    #[test]
    fn test_fixed_range_clamps() {
        let options = PreviewOptions {
            grayscale: true,
            range: Some((100.0, 200.0)),
            ..Default::default()
        };
        let rgba = depth_to_rgba(&depth(vec![50.0, 500.0]), &options);
        assert_eq!(rgba[0], 255);
        assert_eq!(rgba[4], 0);
    }
}
