// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use barcode_scanner::Config;
use barcode_scanner::constants::{BarcodeFormat, DEFAULT_MAX_GAP_FRAMES};
use barcode_scanner::errors::ConfigError;

#[test]
fn test_config_default() {
    // Test that default config can be created
    let config = Config::default();

    // Check sensible defaults
    assert_eq!(
        config.barcode_formats,
        vec![BarcodeFormat::Qr],
        "QR should be the only default format"
    );
    assert_eq!(config.max_gap_frames, DEFAULT_MAX_GAP_FRAMES);
    assert_eq!(config.default_orientation, 0);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_log_filter() {
    // Test that a fallback log filter is set
    let config = Config::default();
    assert!(
        !config.log_filter.is_empty(),
        "Log filter should not be empty"
    );
}

#[test]
fn test_config_save_and_load() {
    let dir = std::env::temp_dir().join(format!("barcode-scanner-it-{}", uuid::Uuid::new_v4()));
    let path = dir.join("nested").join("config.json");

    let config = Config {
        barcode_formats: vec![BarcodeFormat::Qr, BarcodeFormat::Aztec],
        max_gap_frames: 10,
        default_orientation: 90,
        ..Config::default()
    };
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_config_load_missing_file() {
    let path = std::env::temp_dir()
        .join(format!("barcode-scanner-missing-{}", uuid::Uuid::new_v4()))
        .join("config.json");
    assert!(matches!(Config::load(&path), Err(ConfigError::Io(_))));
}

#[test]
fn test_config_load_rejects_empty_formats() {
    let dir = std::env::temp_dir().join(format!("barcode-scanner-it-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.json");
    std::fs::write(&path, r#"{"barcode_formats": []}"#).unwrap();

    assert!(matches!(Config::load(&path), Err(ConfigError::Invalid(_))));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_config_formats_use_snake_case() {
    let json = serde_json::to_value(Config {
        barcode_formats: vec![BarcodeFormat::DataMatrix],
        ..Config::default()
    })
    .unwrap();
    assert_eq!(json["barcode_formats"][0], "data_matrix");
}
