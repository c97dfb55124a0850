//! Configuration for literacy-progress

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ProgressError;

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("literacy-progress")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage directory for the progress database
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Event bus channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Default row limit for history/recent-reads views
    #[serde(default = "default_history_limit")]
    pub history_limit: i64,
}

fn default_event_capacity() -> usize {
    1024
}

fn default_history_limit() -> i64 {
    20
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            event_capacity: 1024,
            history_limit: 20,
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ProgressError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| ProgressError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ProgressError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProgressError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the progress database path
    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join("progress.db")
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }
}
