//! Runtime configuration loaded from `config.toml` in the data directory.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize config at {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },
    #[error("failed to write config file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
    #[error("{field} must not be negative")]
    Negative { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// How long after a task's end it can still be confirmed
    pub grace_period_minutes: i64,
    /// Gaps shorter than this are not shown as free time
    pub min_gap_minutes: i64,
    pub tick_ms: u64,
    /// Status history older than this is pruned on save
    pub history_retention_days: i64,
    /// Seed a starter week when no templates are stored
    pub seed_default_schedule: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            grace_period_minutes: 30,
            min_gap_minutes: 1,
            tick_ms: crate::ticker::DEFAULT_TICK_MS,
            history_retention_days: 30,
            seed_default_schedule: true,
        }
    }
}

impl AppConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::minutes(self.grace_period_minutes)
    }

    pub fn min_gap(&self) -> Duration {
        Duration::minutes(self.min_gap_minutes)
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grace_period_minutes < 0 {
            return Err(ConfigError::Negative { field: "grace_period_minutes" });
        }
        if self.min_gap_minutes <= 0 {
            return Err(ConfigError::NotPositive { field: "min_gap_minutes" });
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::NotPositive { field: "tick_ms" });
        }
        if self.history_retention_days <= 0 {
            return Err(ConfigError::NotPositive { field: "history_retention_days" });
        }
        Ok(())
    }
}

/// Load config, falling back to defaults when the file does not exist
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config).map_err(|source| ConfigError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    crate::persistence::atomic_write(path, &content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
