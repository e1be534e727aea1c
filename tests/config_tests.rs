// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use camera_capture::backends::camera::FrameSize;
use camera_capture::{AppError, Config};
use std::path::PathBuf;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "camera-capture-{}-{}",
        name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.warmup_ms, 500);
    assert_eq!(config.device_path, None);
    assert_eq!(config.log_filter, "warn");
    assert_eq!(config.profile.ideal, FrameSize::new(3840, 2160));
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = scratch_dir("missing");
    let config = Config::load_from(&dir.join("config.json")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_save_and_load() {
    let dir = scratch_dir("roundtrip");
    let path = dir.join("nested").join("config.json");

    let config = Config {
        device_path: Some("/dev/video2".to_string()),
        warmup_ms: 0,
        ..Config::default()
    };
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_zero_framerate_denominator_is_config_error() {
    let dir = scratch_dir("zero-denom");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.json");
    std::fs::write(
        &path,
        r#"{"profile": {"min_framerate": {"num": 30, "denom": 0}}}"#,
    )
    .unwrap();

    let result = Config::load_from(&path);
    assert!(matches!(result, Err(AppError::Config(_))));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_malformed_file_is_config_error() {
    let dir = scratch_dir("malformed");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let result = Config::load_from(&path);
    assert!(matches!(result, Err(AppError::Config(_))));

    let _ = std::fs::remove_dir_all(&dir);
}
