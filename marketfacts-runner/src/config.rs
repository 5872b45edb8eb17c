//! Runner configuration, loaded from TOML.
//!
//! ```toml
//! data_dir = "data/raw"
//! precision = "minute"
//! failure_policy = "skip_and_log"
//! verify_identity = true
//!
//! [[sources]]
//! id = "local"
//! kind = "local_csv"
//! ```

use anyhow::Context;
use marketfacts_core::domain::TimestampPrecision;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config field '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// What a multi-identity fetch does when one identity fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Propagate the first failure.
    #[default]
    FailFast,
    /// Log a warning, record the identity as skipped, continue.
    SkipAndLog,
}

/// One configured data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub id: String,
    pub kind: String,
    /// Overrides the top-level `data_dir` for file-backed kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl SourceConfig {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            data_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    pub data_dir: PathBuf,
    pub precision: TimestampPrecision,
    pub failure_policy: FailurePolicy,
    pub verify_identity: bool,
    pub sources: Vec<SourceConfig>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/raw"),
            precision: TimestampPrecision::Minute,
            failure_policy: FailurePolicy::FailFast,
            verify_identity: true,
            sources: Vec::new(),
        }
    }
}

impl RunnerConfig {
    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "data_dir",
                reason: "must not be empty".into(),
            });
        }

        let mut seen = BTreeSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field: "sources.id",
                    reason: "must not be empty".into(),
                });
            }
            if source.kind.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field: "sources.kind",
                    reason: format!("source '{}' has no kind", source.id),
                });
            }
            if !seen.insert(source.id.as_str()) {
                return Err(ConfigError::Invalid {
                    field: "sources.id",
                    reason: format!("duplicate source id '{}'", source.id),
                });
            }
        }
        Ok(())
    }
}
