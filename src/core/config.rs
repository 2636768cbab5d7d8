//! core::config
//!
//! Coordinator configuration.
//!
//! # Location
//!
//! Deployments keep a `coursewright.toml` next to their course storage;
//! [`CoordinatorConfig::load`] parses it and validates the values. All
//! fields have defaults so an absent file means default behavior.
//!
//! # Example
//!
//! ```toml
//! vcs_backed = true
//! lock_timeout_secs = 5
//! locks_dir = "/var/run/coursewright/locks"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config {path}: {source}")]
    ReadFailed {
        /// The config file path.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML.
    #[error("cannot parse config {path}: {source}")]
    ParseFailed {
        /// The config file path.
        path: String,
        /// The underlying parse error.
        source: toml::de::Error,
    },

    /// A config value is out of range.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

fn default_lock_timeout_secs() -> u64 {
    5
}

/// Configuration for the edit coordinator.
///
/// The `vcs_backed` flag selects between the full ten-phase protocol
/// (commit, push with one retry, sharing validation with rollback) and
/// the reduced disk-only mode (write, then sync, no history).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Whether course repositories are version-control backed.
    pub vcs_backed: bool,

    /// Bounded wait for the per-course lock, in seconds.
    pub lock_timeout_secs: u64,

    /// Directory holding lock files. Defaults to the system temp dir.
    pub locks_dir: Option<PathBuf>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            vcs_backed: true,
            lock_timeout_secs: default_lock_timeout_secs(),
            locks_dir: None,
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed, or if
    /// a value fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::ParseFailed {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "lock_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The lock timeout as a `Duration`.
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    /// The directory where lock files live.
    pub fn locks_dir(&self) -> PathBuf {
        self.locks_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}
