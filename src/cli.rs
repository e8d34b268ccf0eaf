// SPDX-License-Identifier: GPL-3.0-only

//! Command-line entry points

use crate::{ModeArg, StrategyArg};
use chrono::Local;
use image::{ImageBuffer, Luma, RgbaImage};
use std::path::{Path, PathBuf};
use std::time::Instant;
use stereo_depth::backends::FileCameraSession;
use stereo_depth::backends::file_source::load_intensity;
use stereo_depth::depth::visualization::{PreviewOptions, depth_to_rgba};
use stereo_depth::runner::{self, RunMode};
use stereo_depth::sinks::FileSink;
use stereo_depth::{
    CalibrationConstants, Config, DepthConverter, DepthEncoding, DepthSession, DisparityEstimator,
    MatchingStrategy, SessionOptions,
};

/// Default folder name for run outputs
const DEFAULT_OUTPUT_FOLDER: &str = "stereo-depth";

/// Options of the `run` subcommand; `None` keeps the configured value
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub source: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub strategy: Option<StrategyArg>,
    pub mode: Option<ModeArg>,
    pub max_frames: Option<u64>,
    pub repeat: bool,
    pub preview: bool,
}

/// Options of the `compute` subcommand
pub struct ComputeArgs {
    pub left: PathBuf,
    pub right: PathBuf,
    pub output: PathBuf,
    pub strategy: StrategyArg,
    pub calibration: CalibrationConstants,
    pub preview: bool,
}

impl From<StrategyArg> for MatchingStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Nearest => MatchingStrategy::nearest_intensity(),
            StrategyArg::Block => MatchingStrategy::block_matching(),
        }
    }
}

impl From<ModeArg> for RunMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Once => RunMode::Once,
            ModeArg::Loop => RunMode::Loop,
        }
    }
}

/// Replay a recorded session and write every published buffer
pub fn run_pipeline(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load_or_default(args.config.as_deref())?;
    apply_overrides(&mut config, &args);

    let source = config
        .source_dir
        .clone()
        .ok_or("No source directory (use --source or set source_dir in the config file)")?;
    let output = config.output_dir.clone().unwrap_or_else(|| {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        get_default_output_dir().join(format!("run_{}", timestamp))
    });

    let mut camera = FileCameraSession::new(&source).with_repeat(config.repeat);
    if let Some(calibration) = config.calibration {
        camera = camera.with_calibration(calibration);
    }
    let sink = FileSink::new(&output, config.output_format)?;
    let mut session = DepthSession::new(camera, sink, SessionOptions::from(&config))?;

    println!("Source: {}", source.display());
    println!("Output: {}", output.display());
    println!("Strategy: {}", config.strategy);

    // Ctrl+C lets the current cycle finish so the camera is always stopped
    let interrupt = runner::install_interrupt_handler()?;
    if config.run_mode == RunMode::Loop {
        println!("Processing... (press Ctrl+C to stop)");
    }

    let report = runner::run(&mut session, config.run_mode, config.max_frames, &interrupt)?;

    println!();
    println!("Frames processed: {}", report.frames);
    if report.interrupted {
        println!("Stopped by interrupt");
    }
    if let Some(last) = &report.last {
        print_depth_range(last.valid_pixels, last.width * last.height, last.depth_range);
    }
    println!("Files written: {}", session.sink().written());
    if session.sink().failures() > 0 {
        println!("Files failed: {}", session.sink().failures());
    }

    Ok(())
}

fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(source) = &args.source {
        config.source_dir = Some(source.clone());
    }
    if let Some(output) = &args.output {
        config.output_dir = Some(output.clone());
    }
    if let Some(strategy) = args.strategy {
        config.strategy = strategy.into();
    }
    if let Some(mode) = args.mode {
        config.run_mode = mode.into();
    }
    if args.max_frames.is_some() {
        config.max_frames = args.max_frames;
    }
    config.repeat |= args.repeat;
    config.preview |= args.preview;
}

/// Compute depth for one pair of image files
pub fn compute_pair(args: ComputeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let left = load_intensity(&args.left, "left infrared")?;
    let right = load_intensity(&args.right, "right infrared")?;
    println!("Input size: {}x{}", left.width(), left.height());

    let strategy = MatchingStrategy::from(args.strategy);
    let defaults = Config::default();
    let encoding = DepthEncoding::for_kind(
        strategy.output_kind(),
        defaults.quantization_factor,
        defaults.cost_scale,
    );
    let estimator = DisparityEstimator::new(strategy)?;
    let converter = DepthConverter::new(args.calibration, encoding)?;

    println!("Strategy: {}", strategy);
    println!("Processing...");
    let start = Instant::now();
    let disparity = estimator.compute(&left, &right)?;
    let depth = converter.convert(&disparity)?;
    println!("Processing time: {:.2}s", start.elapsed().as_secs_f64());

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let (width, height) = (depth.width() as u32, depth.height() as u32);
    ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(width, height, depth.to_z16().into_vec())
        .ok_or("Depth buffer does not match image size")?
        .save(&args.output)
        .map_err(|e| format!("Failed to save depth PNG: {}", e))?;

    print_depth_range(depth.valid_count(), width as usize * height as usize, depth.valid_range());
    println!("Depth saved: {}", args.output.display());

    if args.preview {
        let preview_path = preview_path(&args.output);
        let rgba = depth_to_rgba(&depth, &PreviewOptions::default());
        RgbaImage::from_raw(width, height, rgba)
            .ok_or("Preview buffer does not match image size")?
            .save(&preview_path)
            .map_err(|e| format!("Failed to save preview PNG: {}", e))?;
        println!("Preview saved: {}", preview_path.display());
    }

    Ok(())
}

/// Print the configuration that `run` would use
pub fn print_config(path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default(path.as_deref())?;
    println!("{}", config.to_json()?);
    Ok(())
}

fn print_depth_range(valid: usize, total: usize, range: Option<(f64, f64)>) {
    println!("Valid pixels: {} of {}", valid, total);
    if let Some((near, far)) = range {
        println!("Depth range: {:.1} - {:.1}", near, far);
    }
}

/// `depth.png` -> `depth_preview.png`
fn preview_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "depth".to_string());
    output.with_file_name(format!("{}_preview.png", stem))
}

/// Get default output directory
fn get_default_output_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(DEFAULT_OUTPUT_FOLDER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_path() {
        assert_eq!(
            preview_path(Path::new("/tmp/out/depth.png")),
            PathBuf::from("/tmp/out/depth_preview.png")
        );
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            &RunArgs {
                config: None,
                source: Some(PathBuf::from("frames")),
                output: None,
                strategy: Some(StrategyArg::Nearest),
                mode: Some(ModeArg::Loop),
                max_frames: Some(10),
                repeat: false,
                preview: true,
            },
        );

        assert_eq!(config.source_dir, Some(PathBuf::from("frames")));
        assert_eq!(config.output_dir, None);
        assert_eq!(config.strategy, MatchingStrategy::nearest_intensity());
        assert_eq!(config.run_mode, RunMode::Loop);
        assert_eq!(config.max_frames, Some(10));
        assert!(config.preview);
        assert!(!config.repeat);
    }
}
