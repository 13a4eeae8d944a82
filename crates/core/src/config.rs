// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline defaults
//!
//! Tunables applied when a specification omits optional arguments. Loaded
//! from the `[defaults]` table of the agent configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Defaults for stage arguments that specifications may omit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PipelineDefaults {
    /// First retry delay of insistentAppend
    #[serde(with = "humantime_serde")]
    pub insistent_initial_backoff: Duration,
    /// Per-attempt retry delay cap of insistentAppend
    #[serde(with = "humantime_serde")]
    pub max_single_backoff: Duration,
    /// Total retry delay before insistentAppend gives up; unset never gives up
    #[serde(with = "humantime_serde")]
    pub max_cumulative_backoff: Option<Duration>,
    /// How often roll sinks poll their trigger
    #[serde(with = "humantime_serde")]
    pub roll_check_period: Duration,
    /// How long close waits for a background task to stop
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    /// How often an idle WAL source rescans for new files
    #[serde(with = "humantime_serde")]
    pub wal_poll_interval: Duration,
}

impl Default for PipelineDefaults {
    fn default() -> Self {
        Self {
            insistent_initial_backoff: Duration::from_millis(1000),
            max_single_backoff: Duration::from_millis(60_000),
            max_cumulative_backoff: None,
            roll_check_period: Duration::from_millis(250),
            shutdown_timeout: Duration::from_secs(5),
            wal_poll_interval: Duration::from_millis(500),
        }
    }
}

impl PipelineDefaults {
    /// Parse from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
