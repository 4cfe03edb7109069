//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe where the meal store lives and how logging is set up.
//! - Open the configured store and start logging from one place.
//!
//! # Invariants
//! - A missing `db_path` means an in-memory store.
//! - `log_dir`, when set, must be absolute.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::{default_log_level, init_logging};
use rusqlite::Connection;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyDbPath,
    RelativeLogDir(PathBuf),
    /// Log dir is not valid UTF-8.
    NonUtf8LogDir(PathBuf),
    /// Logging backend refused to start.
    Logging(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDbPath => write!(f, "db_path cannot be empty"),
            Self::RelativeLogDir(path) => {
                write!(f, "log_dir must be an absolute path, got `{}`", path.display())
            }
            Self::NonUtf8LogDir(path) => {
                write!(f, "log_dir must be valid UTF-8, got `{}`", path.display())
            }
            Self::Logging(message) => write!(f, "logging setup failed: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Settings for opening the meal store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// SQLite file path. `None` opens an in-memory store.
    pub db_path: Option<PathBuf>,
    /// `trace|debug|info|warn|error`; defaults by build mode.
    pub log_level: Option<String>,
    /// Absolute directory for rolling log files. `None` disables file logs.
    pub log_dir: Option<PathBuf>,
}

impl CoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.db_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyDbPath);
            }
        }
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.clone()));
            }
        }
        Ok(())
    }

    pub fn effective_log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }

    /// Opens the configured store with all migrations applied.
    pub fn open_store(&self) -> DbResult<Connection> {
        match &self.db_path {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        }
    }

    /// Starts file logging when `log_dir` is set. Returns `false` when
    /// logging is not configured.
    pub fn init_logging(&self) -> Result<bool, ConfigError> {
        self.validate()?;
        let Some(dir) = &self.log_dir else {
            return Ok(false);
        };
        let dir_str = dir
            .to_str()
            .ok_or_else(|| ConfigError::NonUtf8LogDir(dir.clone()))?;
        init_logging(self.effective_log_level(), dir_str).map_err(ConfigError::Logging)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use std::path::PathBuf;

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let config: CoreConfig =
            serde_json::from_str(r#"{ "db_path": "/tmp/meals.sqlite3" }"#).unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/meals.sqlite3")));
        assert_eq!(config.log_dir, None);
        assert!(!config.effective_log_level().is_empty());
    }

    #[test]
    fn rejects_unknown_keys() {
        let result = serde_json::from_str::<CoreConfig>(r#"{ "database": "x" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_relative_log_dir_and_empty_db_path() {
        let config = CoreConfig {
            log_dir: Some(PathBuf::from("logs")),
            ..CoreConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::RelativeLogDir(PathBuf::from("logs")))
        );

        let config = CoreConfig::with_db_path("");
        assert_eq!(config.validate(), Err(ConfigError::EmptyDbPath));
    }

    #[test]
    fn init_logging_without_log_dir_is_a_no_op() {
        assert_eq!(CoreConfig::in_memory().init_logging(), Ok(false));
    }

    #[test]
    fn in_memory_config_opens_migrated_store() {
        let conn = CoreConfig::in_memory().open_store().unwrap();
        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, crate::db::migrations::latest_version());
    }
}
