//! SQLite-backed task store with a live snapshot stream.
//!
//! # Responsibility
//! - Own the task connection and apply mutations one at a time.
//! - Re-read the ordered task list inside the mutating transaction and
//!   publish it to subscribers after commit.
//!
//! # Invariants
//! - Snapshots are ordered by `priority DESC, id DESC`.
//! - Deleting an id that does not exist fails with `NotFound`.
//! - Logs carry task ids and counts only, never titles or descriptions.

use super::subscription::{SubscriberRegistry, TaskSubscription};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::task::{Task, TaskDraft, TaskId, TaskValidationError};
use crate::repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskRepository};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Full ordered task list emitted atomically by the store.
pub type TaskSnapshot = Arc<[Task]>;

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Caller supplied a task that fails validation.
    Validation(TaskValidationError),
    /// No task with this id exists.
    NotFound(TaskId),
    /// Underlying persistence failed; no state was changed.
    Unavailable(RepoError),
    /// The component that would have executed the operation has shut down.
    Disconnected,
}

impl StoreError {
    /// Stable short code used in log events and FFI messages.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::NotFound(_) => "not_found",
            Self::Unavailable(_) => "store_unavailable",
            Self::Disconnected => "disconnected",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::Unavailable(err) => write!(f, "task store unavailable: {err}"),
            Self::Disconnected => write!(f, "task store is disconnected"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Unavailable(err) => Some(err),
            Self::NotFound(_) | Self::Disconnected => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Unavailable(other),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Unavailable(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Unavailable(RepoError::from(value))
    }
}

/// Durable task collection plus its change stream.
pub struct TaskStore {
    conn: Mutex<Connection>,
    subscribers: Arc<SubscriberRegistry>,
}

impl TaskStore {
    /// Wraps a connection that already has the task schema applied.
    pub fn new(conn: Connection) -> StoreResult<Self> {
        SqliteTaskRepository::try_new(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            subscribers: SubscriberRegistry::new(),
        })
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::new(open_db(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::new(open_db_in_memory()?)
    }

    /// Subscribes to the ordered task list.
    ///
    /// The current snapshot is delivered first, followed by one snapshot per
    /// successful mutation. Each call starts an independent stream.
    pub fn observe_all(&self) -> StoreResult<TaskSubscription> {
        let conn = self.conn.lock();
        let snapshot = load_snapshot(&conn).map_err(|err| {
            error!(
                "event=store_subscribe module=store status=error error_code=snapshot_failed error={err}"
            );
            StoreError::from(err)
        })?;
        Ok(self.subscribers.register(snapshot))
    }

    /// Reads the current ordered task list once.
    pub fn snapshot(&self) -> StoreResult<TaskSnapshot> {
        let conn = self.conn.lock();
        Ok(load_snapshot(&conn)?)
    }

    /// Looks up one task by id.
    pub fn get(&self, id: TaskId) -> StoreResult<Option<Task>> {
        let conn = self.conn.lock();
        let repo = SqliteTaskRepository::try_new(&conn)?;
        Ok(repo.get_task(id)?)
    }

    /// Validates and persists a new task, returning it with its assigned id.
    pub fn insert(&self, draft: &TaskDraft) -> StoreResult<Task> {
        let task = self.mutate("task_insert", None, |repo| repo.insert_task(draft))?;
        debug!("event=task_insert module=store status=ok task_id={}", task.id);
        Ok(task)
    }

    /// Replaces every field of the stored task with `task.id`.
    pub fn update(&self, task: &Task) -> StoreResult<()> {
        self.mutate("task_update", Some(task.id), |repo| repo.update_task(task))
    }

    /// Removes the stored task with `task.id`.
    pub fn delete(&self, task: &Task) -> StoreResult<()> {
        self.mutate("task_delete", Some(task.id), |repo| repo.delete_task(task.id))
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn mutate<T>(
        &self,
        event: &'static str,
        task_id: Option<TaskId>,
        op: impl FnOnce(&SqliteTaskRepository<'_>) -> RepoResult<T>,
    ) -> StoreResult<T> {
        let started_at = Instant::now();
        let task_id = task_id.map_or_else(|| "-".to_string(), |id| id.to_string());
        let mut conn = self.conn.lock();

        match apply_in_transaction(&mut conn, op) {
            Ok((value, snapshot)) => {
                // Still under the connection lock, so emission order matches
                // mutation order.
                let delivered = self.subscribers.broadcast(&snapshot);
                info!(
                    "event={event} module=store status=ok task_id={task_id} task_count={} subscribers={delivered} duration_ms={}",
                    snapshot.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                let err = StoreError::from(err);
                let duration_ms = started_at.elapsed().as_millis();
                match err {
                    StoreError::Unavailable(_) => error!(
                        "event={event} module=store status=error task_id={task_id} error_code={} duration_ms={duration_ms} error={err}",
                        err.code()
                    ),
                    _ => warn!(
                        "event={event} module=store status=rejected task_id={task_id} error_code={} duration_ms={duration_ms}",
                        err.code()
                    ),
                }
                Err(err)
            }
        }
    }
}

impl Drop for TaskStore {
    fn drop(&mut self) {
        self.subscribers.close();
    }
}

fn apply_in_transaction<T>(
    conn: &mut Connection,
    op: impl FnOnce(&SqliteTaskRepository<'_>) -> RepoResult<T>,
) -> RepoResult<(T, TaskSnapshot)> {
    let tx = conn.transaction()?;
    let outcome = {
        let repo = SqliteTaskRepository::try_new(&tx)?;
        let value = op(&repo)?;
        let snapshot: TaskSnapshot = repo.list_tasks()?.into();
        (value, snapshot)
    };
    tx.commit()?;
    Ok(outcome)
}

fn load_snapshot(conn: &Connection) -> RepoResult<TaskSnapshot> {
    let repo = SqliteTaskRepository::try_new(conn)?;
    Ok(repo.list_tasks()?.into())
}
