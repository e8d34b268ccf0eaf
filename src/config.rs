// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::StreamConfig;
use crate::constants::conversion::{DEFAULT_COST_SCALE, DEFAULT_QUANTIZATION_FACTOR};
use crate::depth::CalibrationConstants;
use crate::errors::ConfigError;
use crate::runner::RunMode;
use crate::sinks::OutputFormat;
use crate::stereo::MatchingStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory name under the user config directory
pub const CONFIG_DIR_NAME: &str = "stereo-depth";

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Disparity strategy and its parameters
    pub strategy: MatchingStrategy,
    /// Streams requested from the camera session
    pub streams: StreamConfig,
    /// Fixed-point factor of block matching disparities
    pub quantization_factor: f64,
    /// Display scale of the nearest-intensity cost conversion
    pub cost_scale: f64,
    /// Publish a colorized depth preview
    pub preview: bool,
    /// Grayscale preview instead of the turbo colormap
    pub preview_grayscale: bool,
    /// Run once or until interrupted
    pub run_mode: RunMode,
    /// Upper bound on processed frames in loop mode
    pub max_frames: Option<u64>,
    /// Directory replayed by the file camera session
    pub source_dir: Option<PathBuf>,
    /// Directory receiving published buffers
    pub output_dir: Option<PathBuf>,
    /// Encoding of files written to `output_dir`
    pub output_format: OutputFormat,
    /// Restart replay at the first frame after the last
    pub repeat: bool,
    /// Calibration used instead of the source's own
    pub calibration: Option<CalibrationConstants>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: MatchingStrategy::default(), // Block matching 101x101, 128 disparities
            streams: StreamConfig::default(),
            quantization_factor: DEFAULT_QUANTIZATION_FACTOR,
            cost_scale: DEFAULT_COST_SCALE,
            preview: false,
            preview_grayscale: false,
            run_mode: RunMode::default(),
            max_frames: None,
            source_dir: None,
            output_dir: None,
            output_format: OutputFormat::default(),
            repeat: false,
            calibration: None,
        }
    }
}

impl Config {
    /// Default config file location (`~/.config/stereo-depth/config.json`)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Load a config file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), strategy = %config.strategy, "Loaded configuration");
        Ok(config)
    }

    /// Load `path`, or the default location if it exists, or the defaults
    ///
    /// An explicitly given path must exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let default_path = Self::default_path();
        if default_path.is_file() {
            Self::load(&default_path)
        } else {
            debug!(path = %default_path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write as JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }
}
