// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "stereo-depth")]
#[command(about = "Software depth from rectified infrared stereo pairs")]
#[command(version = stereo_depth::constants::app_info::version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute depth for frames of a recorded session
    Run {
        /// Config file (default: ~/.config/stereo-depth/config.json if present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory with ir{N}_NNNNNN.png frames and calibration.json
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Output directory (default: ~/Pictures/stereo-depth/run_TIMESTAMP)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Disparity strategy
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Process one frame or loop until Ctrl+C
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Stop after this many frames in loop mode
        #[arg(long)]
        max_frames: Option<u64>,

        /// Restart at the first frame after the last
        #[arg(long)]
        repeat: bool,

        /// Also publish a colorized depth preview
        #[arg(long)]
        preview: bool,
    },

    /// Compute depth for a single pair of image files
    Compute {
        /// Left infrared image
        #[arg(short, long)]
        left: PathBuf,

        /// Right infrared image
        #[arg(short, long)]
        right: PathBuf,

        /// Output 16-bit depth PNG
        #[arg(short, long)]
        output: PathBuf,

        /// Disparity strategy
        #[arg(long, value_enum, default_value = "block")]
        strategy: StrategyArg,

        /// Focal length in pixels
        #[arg(long, default_value = "600")]
        focal_length: f64,

        /// Sensor baseline
        #[arg(long, default_value = "50")]
        baseline: f64,

        /// Length per raw depth unit
        #[arg(long, default_value = "0.001")]
        depth_units: f64,

        /// Also write a colorized preview next to the output
        #[arg(long)]
        preview: bool,
    },

    /// Print the effective configuration as JSON
    Config {
        /// Config file (default: ~/.config/stereo-depth/config.json if present)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    /// Per-pixel nearest intensity search
    Nearest,
    /// Block matching (sum of absolute differences)
    Block,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Once,
    Loop,
}

fn main() {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=stereo_depth=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            source,
            output,
            strategy,
            mode,
            max_frames,
            repeat,
            preview,
        } => cli::run_pipeline(cli::RunArgs {
            config,
            source,
            output,
            strategy,
            mode,
            max_frames,
            repeat,
            preview,
        }),
        Commands::Compute {
            left,
            right,
            output,
            strategy,
            focal_length,
            baseline,
            depth_units,
            preview,
        } => cli::compute_pair(cli::ComputeArgs {
            left,
            right,
            output,
            strategy,
            calibration: stereo_depth::CalibrationConstants::new(
                focal_length,
                baseline,
                depth_units,
            ),
            preview,
        }),
        Commands::Config { config } => cli::print_config(config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
