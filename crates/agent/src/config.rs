// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration file
//!
//! ```toml
//! [agent]
//! name = "web-1"
//! log-level = "debug"
//! log-file = "logs/agent.log"
//!
//! [wal]
//! dir = "wal"
//! roll-period = "10s"
//!
//! [pipeline]
//! sink = "insistentAppend => batch(100, 500) => file(\"out\")"
//!
//! [defaults]
//! max-single-backoff = "30s"
//! ```
//!
//! Relative paths are taken from the directory holding the file.

use relay_core::{ConfigError, PipelineDefaults};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    pub agent: AgentSection,
    pub wal: WalSection,
    pub pipeline: PipelineSection,
    pub defaults: PipelineDefaults,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct AgentSection {
    /// Prefix of the WAL files this agent writes
    pub name: String,
    /// Filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Log here instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            name: "agent".to_string(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct WalSection {
    pub dir: PathBuf,
    /// How long one WAL file collects events before it is handed off
    #[serde(with = "humantime_serde")]
    pub roll_period: Duration,
}

impl Default for WalSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("wal"),
            roll_period: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSection {
    /// Chain the WAL is forwarded through
    pub sink: String,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            sink: "null".to_string(),
        }
    }
}

impl AgentConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from `path`; a missing file yields the defaults rooted at the
    /// file's directory
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.rooted_at(base))
    }

    fn rooted_at(mut self, base: &Path) -> Self {
        self.wal.dir = base.join(&self.wal.dir);
        self.agent.log_file = self.agent.log_file.map(|p| base.join(p));
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
