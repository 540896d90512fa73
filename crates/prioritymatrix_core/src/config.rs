//! Runtime configuration resolved from the environment.
//!
//! # Invariants
//! - Blank environment values are treated as unset.
//! - Resolution never fails; invalid values surface later at use sites
//!   (`init_logging`, `TaskStore::open`).

use crate::logging::{default_log_level, LoggingConfig};
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "PRIORITYMATRIX_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "PRIORITYMATRIX_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "PRIORITYMATRIX_LOG_DIR";
pub const DEFAULT_DB_FILE_NAME: &str = "prioritymatrix.sqlite3";

/// Settings shared by the FFI layer and the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Reads `PRIORITYMATRIX_*` variables over the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|trimmed| !trimmed.is_empty())
        };

        let defaults = Self::default();
        Self {
            db_path: value(DB_PATH_ENV).map_or(defaults.db_path, PathBuf::from),
            log_level: value(LOG_LEVEL_ENV).unwrap_or(defaults.log_level),
            log_dir: value(LOG_DIR_ENV).map(PathBuf::from),
        }
    }

    /// Logging settings, when a log directory is configured.
    pub fn logging(&self) -> Option<LoggingConfig> {
        self.log_dir
            .as_ref()
            .map(|dir| LoggingConfig::new(self.log_level.clone(), dir.clone()))
    }
}
