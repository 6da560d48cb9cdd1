use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("settings validation failed: {0}")]
    Settings(String),
}

pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 5;
pub const DEFAULT_RETRIEVAL_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRIEVAL_SLEEP_MS: u64 = 2000;
pub const DEFAULT_FAILURE_MARKER: &str = "ERROR";

/// Orchestrator tuning knobs. Every field has a default so an empty or
/// missing settings file yields a working configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Activation poll cadence; the attempt budget is the job's declared
    /// timeout divided by this, rounded up.
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_retrieval_attempts")]
    pub retrieval_attempts: u32,
    #[serde(default = "default_retrieval_sleep_ms")]
    pub retrieval_sleep_ms: u64,
    /// Literal marker the verdict scan looks for in retrieved messages.
    #[serde(default = "default_failure_marker")]
    pub failure_marker: String,
}

fn default_poll_interval_seconds() -> u64 {
    DEFAULT_POLL_INTERVAL_SECONDS
}

fn default_retrieval_attempts() -> u32 {
    DEFAULT_RETRIEVAL_ATTEMPTS
}

fn default_retrieval_sleep_ms() -> u64 {
    DEFAULT_RETRIEVAL_SLEEP_MS
}

fn default_failure_marker() -> String {
    DEFAULT_FAILURE_MARKER.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECONDS,
            retrieval_attempts: DEFAULT_RETRIEVAL_ATTEMPTS,
            retrieval_sleep_ms: DEFAULT_RETRIEVAL_SLEEP_MS,
            failure_marker: DEFAULT_FAILURE_MARKER.to_string(),
        }
    }
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_seconds == 0 {
            return Err(ConfigError::Settings(
                "`poll_interval_seconds` must be greater than zero".to_string(),
            ));
        }
        if self.retrieval_attempts == 0 {
            return Err(ConfigError::Settings(
                "`retrieval_attempts` must be greater than zero".to_string(),
            ));
        }
        if self.failure_marker.trim().is_empty() {
            return Err(ConfigError::Settings(
                "`failure_marker` must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads settings from `path`, falling back to defaults when the file
/// does not exist.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let settings = if path.exists() {
        Settings::from_path(path)?
    } else {
        Settings::default()
    };
    settings.validate()?;
    Ok(settings)
}
