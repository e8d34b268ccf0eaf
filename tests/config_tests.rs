// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use std::path::PathBuf;
use stereo_depth::{Config, MatchingStrategy, RunMode, StreamConfig};

fn scratch_file(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("stereo-depth-config-{}-{}", name, std::process::id()))
        .join("config.json")
}

#[test]
fn test_config_default() {
    // Test that default config matches the observed block matching setup
    let config = Config::default();

    assert_eq!(
        config.strategy,
        MatchingStrategy::BlockMatching {
            block_size: 101,
            num_disparities: 128
        }
    );
    assert_eq!(config.quantization_factor, 32.0);
    assert_eq!(config.cost_scale, 1000.0);
    assert_eq!(config.run_mode, RunMode::Once);
    assert!(!config.preview, "Preview should be disabled by default");
    assert_eq!(config.streams, StreamConfig::default());
}

#[test]
fn test_config_save_and_load() {
    let path = scratch_file("save");
    let config = Config {
        strategy: MatchingStrategy::nearest_intensity(),
        run_mode: RunMode::Loop,
        max_frames: Some(12),
        source_dir: Some(PathBuf::from("/data/recording")),
        ..Config::default()
    };

    config.save(&path).unwrap();
    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let path = scratch_file("missing");
    assert!(Config::load_or_default(Some(path.as_path())).is_err());
}

#[test]
fn test_malformed_file_is_a_parse_error() {
    let path = scratch_file("malformed");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, stereo_depth::errors::ConfigError::Parse(_)));

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
