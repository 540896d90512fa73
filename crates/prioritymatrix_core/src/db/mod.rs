//! SQLite bootstrap and schema migrations for the task store.
//!
//! # Responsibility
//! - Open and configure task database connections.
//! - Apply schema migrations before any task data is touched.
//! - Refuse connections whose schema does not match this binary.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - A database written by a newer binary is never opened.

use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Connection was not opened through [`open_db`] / [`open_db_in_memory`].
    TaskSchemaMissing { db_version: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "task database error: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "task database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::TaskSchemaMissing { db_version } => write!(
                f,
                "tasks table is missing (schema version {db_version}); open the database with open_db"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::TaskSchemaMissing { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Checks that `conn` carries the current task schema.
pub fn ensure_task_schema(conn: &Connection) -> DbResult<()> {
    let db_version = migrations::current_user_version(conn)?;
    let has_tasks: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'tasks'
        );",
        [],
        |row| row.get(0),
    )?;

    if db_version > migrations::latest_version() {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported: migrations::latest_version(),
        });
    }
    if !has_tasks || db_version < migrations::latest_version() {
        return Err(DbError::TaskSchemaMissing { db_version });
    }
    Ok(())
}
