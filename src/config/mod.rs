//! Server configuration.
//!
//! The root directory comes from the command line; everything else is
//! optional and read from a TOML file passed with `--config` (or the
//! `CODEBASE_MCP_CONFIG` environment variable). Every key has a default, so
//! an empty file and no file at all behave the same.
//!
//! ```toml
//! [cache]
//! max_age_ms = 600000          # entries older than this are misses
//! check_file_changes = true    # re-fingerprint the source file on every hit
//! cleanup_interval_ms = 300000 # how often the background sweep runs
//! cleanup_max_age_ms = 1800000 # sweep drops entries older than this
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::CacheOptions;
use crate::constants::{
    DEFAULT_CACHE_MAX_AGE, DEFAULT_CLEANUP_INTERVAL, DEFAULT_CLEANUP_MAX_AGE, MAX_CLEANUP_INTERVAL,
};
use crate::core::CodebaseError;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Result cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// `[cache]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum age of a served entry, in milliseconds.
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,
    /// Whether cache hits are revalidated against the source file.
    #[serde(default = "default_check_file_changes")]
    pub check_file_changes: bool,
    /// Interval of the background sweep, in milliseconds.
    #[serde(default = "default_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,
    /// Age after which the sweep drops entries, in milliseconds.
    #[serde(default = "default_cleanup_max_age_ms")]
    pub cleanup_max_age_ms: u64,
}

const fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

const fn default_max_age_ms() -> u64 {
    millis(DEFAULT_CACHE_MAX_AGE)
}

const fn default_check_file_changes() -> bool {
    true
}

const fn default_cleanup_interval_ms() -> u64 {
    millis(DEFAULT_CLEANUP_INTERVAL)
}

const fn default_cleanup_max_age_ms() -> u64 {
    millis(DEFAULT_CLEANUP_MAX_AGE)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_ms: default_max_age_ms(),
            check_file_changes: default_check_file_changes(),
            cleanup_interval_ms: default_cleanup_interval_ms(),
            cleanup_max_age_ms: default_cleanup_max_age_ms(),
        }
    }
}

impl CacheConfig {
    /// Validation options for the result cache.
    #[must_use]
    pub const fn options(&self) -> CacheOptions {
        CacheOptions {
            max_age: Duration::from_millis(self.max_age_ms),
            check_file_changes: self.check_file_changes,
        }
    }

    /// Interval of the background sweep, capped at [`MAX_CLEANUP_INTERVAL`].
    #[must_use]
    pub const fn cleanup_interval(&self) -> Duration {
        if self.cleanup_interval_ms > millis(MAX_CLEANUP_INTERVAL) {
            MAX_CLEANUP_INTERVAL
        } else {
            Duration::from_millis(self.cleanup_interval_ms)
        }
    }

    /// Age threshold of the background sweep.
    #[must_use]
    pub const fn cleanup_max_age(&self) -> Duration {
        Duration::from_millis(self.cleanup_max_age_ms)
    }
}

impl ServerConfig {
    /// Load the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, or with [`CodebaseError::ConfigError`]
    /// if it is not valid TOML for this schema.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config = toml::from_str(&content).map_err(|e| CodebaseError::ConfigError {
            message: format!("Failed to parse {}: {}", path.display(), e.message()),
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from `path` after `~` expansion, or return defaults when no path
    /// was given.
    ///
    /// # Errors
    ///
    /// See [`load_from`](Self::load_from). A path that was given but does
    /// not exist is an error.
    pub async fn load_optional(path: Option<&str>) -> Result<Self> {
        match path {
            Some(raw) => Self::load_from(&expand_config_path(raw)).await,
            None => Ok(Self::default()),
        }
    }
}

/// Expand a leading `~` in a configuration file path.
pub fn expand_config_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}
