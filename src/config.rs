// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{
    BarcodeFormat, CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_FRAME_INTERVAL,
    DEFAULT_MAX_GAP_FRAMES,
};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Scanner settings
///
/// Missing fields take their defaults, so a config file only needs to list
/// what it changes.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Symbologies to look for
    pub barcode_formats: Vec<BarcodeFormat>,
    /// Consecutive frames a code may be missing before it is reported gone
    pub max_gap_frames: u32,
    /// Device orientation assumed when the producer does not supply one
    pub default_orientation: i32,
    /// Delay between frames when replaying still images
    pub frame_interval_ms: u64,
    /// Log filter used when RUST_LOG is not set
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            barcode_formats: vec![BarcodeFormat::Qr],
            max_gap_frames: DEFAULT_MAX_GAP_FRAMES,
            default_orientation: 0,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL.as_millis() as u64,
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// Default location of the config file (`~/.config/barcode-scanner/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Read the config from its default location, falling back to defaults
    /// when the file is absent or unusable
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unusable config file");
                Self::default()
            }
        }
    }

    /// Write the config as pretty-printed JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.barcode_formats.is_empty() {
            return Err(ConfigError::Invalid(
                "barcode_formats must list at least one format".to_string(),
            ));
        }
        Ok(())
    }

    /// Frame interval as a duration
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"max_gap_frames": 7}"#).unwrap();
        assert_eq!(config.max_gap_frames, 7);
        assert_eq!(config.barcode_formats, vec![BarcodeFormat::Qr]);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_validate_rejects_empty_formats() {
        let config = Config {
            barcode_formats: Vec::new(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("barcode-scanner-{}", uuid::Uuid::new_v4()));
        let path = dir.join(CONFIG_FILE_NAME);

        let config = Config {
            barcode_formats: vec![BarcodeFormat::Qr, BarcodeFormat::Aztec],
            frame_interval_ms: 10,
            ..Config::default()
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("barcode-scanner-does-not-exist.json");
        assert!(matches!(Config::load(&path), Err(ConfigError::Io(_))));
    }
}
