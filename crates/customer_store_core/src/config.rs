//! Store configuration loaded from environment variables.
//!
//! All values are read and validated up front so a bad setting fails at
//! startup rather than on the first query.
//!
//! | variable | meaning | default |
//! |---|---|---|
//! | `CUSTOMER_STORE_DB_PATH` | SQLite file path, `:memory:` for in-memory | in-memory |
//! | `CUSTOMER_STORE_BUSY_TIMEOUT_MS` | lock wait before a call fails with a timeout | `5000` |
//! | `CUSTOMER_STORE_LOG_LEVEL` | `trace`/`debug`/`info`/`warn`/`error` | build-mode default |
//! | `CUSTOMER_STORE_LOG_DIR` | absolute directory for rolling log files | unset (no file logs) |

use crate::logging::{default_log_level, normalize_level};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DB_PATH_VAR: &str = "CUSTOMER_STORE_DB_PATH";
pub const BUSY_TIMEOUT_VAR: &str = "CUSTOMER_STORE_BUSY_TIMEOUT_MS";
pub const LOG_LEVEL_VAR: &str = "CUSTOMER_STORE_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "CUSTOMER_STORE_LOG_DIR";

/// Busy timeout applied when none is configured.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const IN_MEMORY_PATH: &str = ":memory:";

/// Where the store keeps its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// Private in-memory database, discarded with the connection.
    Memory,
    /// SQLite database file, created on first open.
    File(PathBuf),
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("configuration error for {field}: {message}")]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

/// Validated store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database: DatabaseTarget,
    pub busy_timeout: Duration,
    /// Normalized log level name.
    pub log_level: &'static str,
    /// File logging is enabled only when set.
    pub log_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: DatabaseTarget::Memory,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl StoreConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let database = match read(DB_PATH_VAR) {
            None => DatabaseTarget::Memory,
            Some(path) if path == IN_MEMORY_PATH => DatabaseTarget::Memory,
            Some(path) => DatabaseTarget::File(PathBuf::from(path)),
        };

        let busy_timeout = match read(BUSY_TIMEOUT_VAR) {
            None => DEFAULT_BUSY_TIMEOUT,
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|err| ConfigError {
                    field: BUSY_TIMEOUT_VAR,
                    message: format!("expected milliseconds, got `{raw}`: {err}"),
                })?,
        };

        let log_level = match read(LOG_LEVEL_VAR) {
            None => default_log_level(),
            Some(raw) => normalize_level(&raw).map_err(|err| ConfigError {
                field: LOG_LEVEL_VAR,
                message: err.to_string(),
            })?,
        };

        let log_dir = match read(LOG_DIR_VAR).map(PathBuf::from) {
            Some(dir) if !dir.is_absolute() => {
                return Err(ConfigError {
                    field: LOG_DIR_VAR,
                    message: format!("must be an absolute path, got `{}`", dir.display()),
                });
            }
            other => other,
        };

        Ok(Self {
            database,
            busy_timeout,
            log_level,
            log_dir,
        })
    }
}
