//! Daemon configuration loading.
//!
//! TOML file with serde defaults for every field, so a missing or partial
//! file degrades to the built-in constants.
//!
//! # TOML Example
//!
//! ```toml
//! device_path = "/dev/motor"
//! socket_path = "/run/ptzd.sock"
//! pid_path = "/run/ptzd.pid"
//! default_speed = 900
//! poll_interval_ms = 100
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{
    DEFAULT_DEVICE_PATH, DEFAULT_PID_PATH, DEFAULT_POLL_INTERVAL, DEFAULT_SOCKET_PATH,
    DEFAULT_SPEED, MAX_SPEED, MIN_SPEED,
};

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    /// Motor character device.
    pub device_path: PathBuf,
    /// Unix socket the daemon listens on.
    pub socket_path: PathBuf,
    /// PID file for single-instance enforcement.
    pub pid_path: PathBuf,
    /// Session speed before the first set-speed request [steps/s].
    pub default_speed: u32,
    /// Busy-state poll interval while waiting for motion [ms].
    pub poll_interval_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(DEFAULT_DEVICE_PATH),
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            pid_path: PathBuf::from(DEFAULT_PID_PATH),
            default_speed: DEFAULT_SPEED,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// - `FileNotFound` if the file does not exist
    /// - `ParseError` if TOML syntax is invalid
    /// - `ValidationError` if semantic validation fails
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if:
    /// - `default_speed` is outside the driver's accepted range
    /// - `poll_interval_ms` is zero
    /// - any path is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_speed < MIN_SPEED || self.default_speed > MAX_SPEED {
            return Err(ConfigError::ValidationError(format!(
                "default_speed {} outside {}..={}",
                self.default_speed, MIN_SPEED, MAX_SPEED
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be nonzero".to_string(),
            ));
        }
        for (name, path) in [
            ("device_path", &self.device_path),
            ("socket_path", &self.socket_path),
            ("pid_path", &self.pid_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{name} cannot be empty"
                )));
            }
        }
        Ok(())
    }

    /// Busy-state poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
