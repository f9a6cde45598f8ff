//! Scanner configuration with TOML file support.
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::block::VersionThresholds;
use crate::logging::LogFormat;
use crate::tip::DEFAULT_PROBE_STEP;

/// Failures while loading a [`ScanConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("read {path}: {source}")]
    Io {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Values parsed but are inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Process-wide settings, built once at startup and passed down explicitly.
///
/// Every field has a default, so an empty file is a valid config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory of the node's ledger store.
    pub ledger_path: PathBuf,
    /// SQLite file holding target configuration and cursors.
    pub target_db: PathBuf,
    /// First step of the chain-tip probe.
    pub tip_probe_step: u64,
    /// Minimum seconds between progress log lines.
    pub progress_interval_secs: u64,
    /// Default filter directive when `RUST_LOG` is unset.
    pub log_level: String,
    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,
    /// Heights at which block record formats change.
    pub thresholds: VersionThresholds,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from("./.storage/db_mainnet/icon_dex"),
            target_db: PathBuf::from("./itx.sqlite"),
            tip_probe_step: DEFAULT_PROBE_STEP,
            progress_interval_secs: 30,
            log_level: "info".to_string(),
            log_format: LogFormat::Human,
            thresholds: VersionThresholds::default(),
        }
    }
}

impl ScanConfig {
    /// Load and validate a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject descending thresholds and a zero probe step.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.thresholds.is_ascending() {
            return Err(ConfigError::Invalid(format!(
                "block version thresholds must be ascending: {:?}",
                self.thresholds
            )));
        }
        if self.tip_probe_step == 0 {
            return Err(ConfigError::Invalid("tip_probe_step must be at least 1".into()));
        }
        Ok(())
    }

    /// [`Self::progress_interval_secs`] as a `Duration`.
    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs)
    }
}
