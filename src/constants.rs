// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Matching constants shared by both disparity strategies
pub mod matching {
    /// Column search width for the nearest-intensity strategy
    pub const DEFAULT_MAX_OFFSET: usize = 16;

    /// Disparity search range for block matching
    pub const DEFAULT_NUM_DISPARITIES: usize = 128;

    /// Side of the square block matching window (must be odd)
    pub const DEFAULT_BLOCK_SIZE: usize = 101;

    /// Marker for "no usable match" in a disparity map
    pub const INVALID_DISPARITY: f32 = -1.0;
}

/// Depth conversion constants
pub mod conversion {
    /// Fixed-point factor of block matching disparities
    pub const DEFAULT_QUANTIZATION_FACTOR: f64 = 32.0;

    /// Display scale of the inverse-cost conversion
    ///
    /// Tuned for preview contrast, it carries no metric meaning.
    pub const DEFAULT_COST_SCALE: f64 = 1000.0;

    /// Depth value written where no depth could be computed
    pub const NO_DEPTH: f64 = 0.0;
}

/// Stable channel identifiers for published buffers
pub mod channels {
    /// Left infrared image
    pub const LEFT_INFRARED: u32 = 0;

    /// Right infrared image
    pub const RIGHT_INFRARED: u32 = 1;

    /// Depth computed from the stereo pair
    pub const COMPUTED_DEPTH: u32 = 2;

    /// Hardware depth passthrough
    pub const HARDWARE_DEPTH: u32 = 3;

    /// Colorized preview of the computed depth
    pub const DEPTH_PREVIEW: u32 = 4;
}

/// Preview rendering constants
pub mod preview {
    /// Number of quantization bands for the depth colormap
    pub const COLORMAP_BANDS: f32 = 32.0;
}

/// Timing constants
pub mod timing {
    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;
}

/// File layout used by the file based camera session and sink
pub mod file_layout {
    /// Calibration file expected next to replayed frames
    pub const CALIBRATION_FILE: &str = "calibration.json";

    /// Prefix of infrared frame files (`ir{index}_{frame}.png`)
    pub const INFRARED_PREFIX: &str = "ir";

    /// Prefix of hardware depth frame files (`depth_{frame}.png`)
    pub const DEPTH_PREFIX: &str = "depth";

    /// Digits in the zero-padded frame number
    pub const FRAME_DIGITS: usize = 6;

    /// Build the file name for a frame of a stream
    pub fn frame_file_name(prefix: &str, frame: u64) -> String {
        format!("{prefix}_{frame:0width$}.png", width = FRAME_DIGITS)
    }
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
