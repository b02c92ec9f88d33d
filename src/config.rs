//! Recorder configuration
//!
//! Every field has a default so a partial (or missing) config file works.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable pointing at a config file for the runner
pub const CONFIG_ENV_VAR: &str = "POINTCLOUD_RECORDER_CONFIG";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration for the flush pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderConfig {
    /// Directory artifacts are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Whether to pretty-print artifact JSON
    #[serde(default)]
    pub pretty_print: bool,

    /// Whether a failed flush still resets the live session
    #[serde(default = "default_reset_after_failed_flush")]
    pub reset_after_failed_flush: bool,

    /// Capacity of the recording event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_output_dir() -> PathBuf {
    if let Some(mut path) = dirs::document_dir() {
        path.push("PointCloudRecorder");
        return path;
    }
    // No documents directory (headless hosts)
    PathBuf::from("recordings")
}

fn default_reset_after_failed_flush() -> bool {
    true
}

fn default_event_capacity() -> usize {
    100
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            pretty_print: false,
            reset_after_failed_flush: default_reset_after_failed_flush(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl RecorderConfig {
    /// Default configuration writing into `output_dir`
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        tracing::debug!("Loaded config from {:?}", path);

        Ok(config)
    }

    /// Load from `POINTCLOUD_RECORDER_CONFIG` if set, otherwise use defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "eventCapacity must be greater than zero".to_string(),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("outputDir must not be empty".to_string()));
        }
        Ok(())
    }
}
