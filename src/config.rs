// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::types::CaptureRequestProfile;
use crate::constants::{app_info, timing};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Persistent user configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera device node; the first capture device is used when unset
    pub device_path: Option<String>,
    /// Ideal and minimum capture characteristics
    pub profile: CaptureRequestProfile,
    /// How long to wait for the first rendered frame
    pub playback_timeout_secs: u64,
    /// Frames to let pass before the first still (auto exposure settling)
    pub warmup_ms: u64,
    /// Fallback log filter when RUST_LOG is unset
    pub log_filter: String,
    /// Where stills are saved; ~/Pictures/camera when unset
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_path: None,
            profile: CaptureRequestProfile::default(),
            playback_timeout_secs: timing::PLAYBACK_TIMEOUT_SECS,
            warmup_ms: timing::WARMUP_MS,
            log_filter: "warn".to_string(),
            output_dir: None,
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(app_info::CONFIG_DIR).join(app_info::CONFIG_FILE))
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> AppResult<Self> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory available, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AppError::Config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Save to the default location
    pub fn save(&self) -> AppResult<PathBuf> {
        let path = Self::path()
            .ok_or_else(|| AppError::Config("No config directory available".to_string()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save to `path` as pretty-printed JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Directory stills are written to
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            dirs::picture_dir()
                .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
                .join(app_info::PICTURES_DIR)
        })
    }

    pub fn playback_timeout(&self) -> Duration {
        Duration::from_secs(self.playback_timeout_secs)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"warmup_ms": 80}"#).unwrap();
        assert_eq!(config.warmup_ms, 80);
        assert_eq!(config.playback_timeout_secs, timing::PLAYBACK_TIMEOUT_SECS);
        assert_eq!(config.profile, CaptureRequestProfile::default());
    }

    #[test]
    fn test_explicit_output_dir_wins() {
        let config = Config {
            output_dir: Some(PathBuf::from("/tmp/stills")),
            ..Config::default()
        };
        assert_eq!(config.output_dir(), PathBuf::from("/tmp/stills"));
    }
}
