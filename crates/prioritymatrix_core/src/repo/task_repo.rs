//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/update/delete/get/list over the `tasks` table.
//! - Decode rows strictly and reject corrupted persisted state.
//!
//! # Invariants
//! - Listing order is `priority DESC, id DESC`.
//! - Ids come from `AUTOINCREMENT` and are never reused after delete.

use crate::db::{ensure_task_schema, DbError};
use crate::model::task::{Priority, Task, TaskDraft, TaskId, TaskValidationError};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    priority,
    is_important,
    is_urgent,
    is_completed,
    due_at
FROM tasks";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    NotFound(TaskId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Data access contract for tasks.
pub trait TaskRepository {
    fn insert_task(&self, draft: &TaskDraft) -> RepoResult<Task>;
    fn update_task(&self, task: &Task) -> RepoResult<()>;
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    fn list_tasks(&self) -> RepoResult<Vec<Task>>;
}

/// SQLite-backed task repository borrowing a migrated connection.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Wraps a connection after checking it carries the current task schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_task_schema(conn)?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn insert_task(&self, draft: &TaskDraft) -> RepoResult<Task> {
        draft.validate()?;

        self.conn.execute(
            "INSERT INTO tasks (
                title,
                description,
                priority,
                is_important,
                is_urgent,
                is_completed,
                due_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                draft.title.as_str(),
                draft.description.as_str(),
                priority_to_db(draft.priority),
                draft.is_important,
                draft.is_urgent,
                draft.is_completed,
                draft.due_at,
            ],
        )?;

        Ok(draft.clone().into_task(self.conn.last_insert_rowid()))
    }

    fn update_task(&self, task: &Task) -> RepoResult<()> {
        task.validate()?;

        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                title = ?1,
                description = ?2,
                priority = ?3,
                is_important = ?4,
                is_urgent = ?5,
                is_completed = ?6,
                due_at = ?7,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?8;",
            params![
                task.title.as_str(),
                task.description.as_str(),
                priority_to_db(task.priority),
                task.is_important,
                task.is_urgent,
                task.is_completed,
                task.due_at,
                task.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(task.id));
        }
        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let raw = stmt.query_row([id], read_raw_row).optional()?;
        raw.map(RawTaskRow::into_task).transpose()
    }

    fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{TASK_SELECT_SQL} ORDER BY priority DESC, id DESC;"))?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(read_raw_row(row)?.into_task()?);
        }
        Ok(tasks)
    }
}

/// Row as stored, before enum/bool decoding.
struct RawTaskRow {
    id: TaskId,
    title: String,
    description: String,
    priority: i64,
    is_important: i64,
    is_urgent: i64,
    is_completed: i64,
    due_at: Option<i64>,
}

fn read_raw_row(row: &Row<'_>) -> rusqlite::Result<RawTaskRow> {
    Ok(RawTaskRow {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        priority: row.get("priority")?,
        is_important: row.get("is_important")?,
        is_urgent: row.get("is_urgent")?,
        is_completed: row.get("is_completed")?,
        due_at: row.get("due_at")?,
    })
}

impl RawTaskRow {
    fn into_task(self) -> RepoResult<Task> {
        let priority = priority_from_db(self.priority).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid priority `{}` in tasks.priority for task {}",
                self.priority, self.id
            ))
        })?;

        let task = Task {
            id: self.id,
            title: self.title,
            description: self.description,
            priority,
            is_important: flag_from_db("is_important", self.is_important)?,
            is_urgent: flag_from_db("is_urgent", self.is_urgent)?,
            is_completed: flag_from_db("is_completed", self.is_completed)?,
            due_at: self.due_at,
        };
        task.validate()?;
        Ok(task)
    }
}

fn priority_to_db(priority: Priority) -> i64 {
    match priority {
        Priority::Low => 0,
        Priority::Medium => 1,
        Priority::High => 2,
    }
}

fn priority_from_db(value: i64) -> Option<Priority> {
    match value {
        0 => Some(Priority::Low),
        1 => Some(Priority::Medium),
        2 => Some(Priority::High),
        _ => None,
    }
}

fn flag_from_db(column: &str, value: i64) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid {column} value `{other}` in tasks.{column}"
        ))),
    }
}
