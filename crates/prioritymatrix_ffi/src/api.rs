//! FFI use-case API for the Flutter shell.
//!
//! # Responsibility
//! - Expose task commands and matrix queries as sync FRB calls.
//! - Translate core errors into stable response envelopes.
//!
//! # Invariants
//! - Exported functions never panic across the FFI boundary.
//! - The process shares one `TaskListController`, opened lazily from
//!   `CoreConfig`, with one observer kept attached for reads.
//! - A successful command is visible to the next `task_list`/`matrix_view`.

use log::warn;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use prioritymatrix_core::{
    classify, core_version as core_version_inner, init_logging as init_logging_inner,
    now_epoch_ms, ping as ping_inner, CoreConfig, LoggingConfig, MatrixFilter, Priority,
    Quadrant, StoreError, Task, TaskDraft, TaskListController, TaskListObserver, TaskSnapshot,
    TaskStore,
};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound for a committed command to reach the attached observer.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(2);

static SESSION: OnceCell<Session> = OnceCell::new();

struct Session {
    controller: TaskListController,
    observer: Mutex<TaskListObserver>,
}

impl Session {
    fn tasks(&self) -> TaskSnapshot {
        self.controller.tasks()
    }

    /// Blocks until the published list satisfies `done`.
    ///
    /// Commands resolve once the store commits; the observer may lag behind.
    fn await_published(&self, command: &str, done: impl Fn(&[Task]) -> bool) {
        if self
            .observer
            .lock()
            .wait_for(PUBLISH_TIMEOUT, done)
            .is_none()
        {
            warn!(
                "event=ffi_command module=ffi status=stale command={command} timeout_ms={}",
                PUBLISH_TIMEOUT.as_millis()
            );
        }
    }

    fn find(&self, id: i64) -> Result<Task, StoreError> {
        self.tasks()
            .iter()
            .find(|task| task.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }
}

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Core crate version.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core file logging once per process.
///
/// # FFI contract
/// - Idempotent for the same `level + log_dir`.
/// - Returns an empty string on success and an error message otherwise.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(&LoggingConfig::new(level, log_dir)) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Flat task shape for Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// `low|medium|high`.
    pub priority: String,
    pub is_important: bool,
    pub is_urgent: bool,
    pub is_completed: bool,
    pub due_at_ms: Option<i64>,
    /// Evaluated against the wall clock when the response was built.
    pub is_overdue: bool,
}

/// Result envelope for task commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskActionResponse {
    pub ok: bool,
    /// Affected task after the command, when there is one.
    pub task: Option<TaskItem>,
    /// Stable error code (`validation_failed|not_found|store_unavailable|...`).
    pub error_code: Option<String>,
    pub message: String,
}

impl TaskActionResponse {
    fn success(message: impl Into<String>, task: Option<TaskItem>) -> Self {
        Self {
            ok: true,
            task,
            error_code: None,
            message: message.into(),
        }
    }

    fn failure(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            task: None,
            error_code: Some(error_code.to_string()),
            message: message.into(),
        }
    }

    fn from_store_error(command: &str, err: &StoreError) -> Self {
        warn!(
            "event=ffi_command module=ffi status=error command={command} error_code={}",
            err.code()
        );
        Self::failure(err.code(), format!("{command} failed: {err}"))
    }
}

/// Ordered task list envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    pub items: Vec<TaskItem>,
    pub message: String,
}

/// One quadrant card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadrantGroup {
    /// Wire name, e.g. `important_urgent`.
    pub key: String,
    pub label: String,
    pub items: Vec<TaskItem>,
}

/// Filtered matrix envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixResponse {
    /// Always four groups, Q1..Q4, possibly empty.
    pub quadrants: Vec<QuadrantGroup>,
    pub total: u32,
    pub message: String,
}

/// Creates a task.
///
/// Input semantics:
/// - `title`: stored as entered; a blank title fails with `validation_failed`.
/// - `priority`: `low|medium|high`, case-insensitive.
/// - `quadrant`: `important_urgent|important_not_urgent|urgent_not_important|neither`.
/// - `due_at_ms`: optional Unix epoch milliseconds.
#[flutter_rust_bridge::frb(sync)]
pub fn task_add(
    title: String,
    description: String,
    priority: String,
    quadrant: String,
    due_at_ms: Option<i64>,
) -> TaskActionResponse {
    let Some(priority) = Priority::parse(&priority) else {
        return TaskActionResponse::failure(
            "invalid_argument",
            format!("task_add failed: unknown priority `{priority}`"),
        );
    };
    let Some(quadrant) = Quadrant::parse(&quadrant) else {
        return TaskActionResponse::failure(
            "invalid_argument",
            format!("task_add failed: unknown quadrant `{quadrant}`"),
        );
    };

    let draft = TaskDraft::new(title)
        .with_description(description)
        .with_priority(priority)
        .in_quadrant(quadrant)
        .due_at(due_at_ms);

    let result = with_session(|session| {
        let task = session.controller.add_task(draft).wait()?;
        session.await_published("task_add", |tasks| {
            tasks.iter().any(|listed| listed.id == task.id)
        });
        Ok(task)
    });

    match result {
        Ok(task) => TaskActionResponse::success(
            "Task created.",
            Some(to_item(&task, now_epoch_ms())),
        ),
        Err(err) => TaskActionResponse::from_store_error("task_add", &err),
    }
}

/// Replaces every editable field of the task with `item.id`.
///
/// `is_overdue` on the input is ignored; the title is stored as entered.
#[flutter_rust_bridge::frb(sync)]
pub fn task_update(item: TaskItem) -> TaskActionResponse {
    let Some(priority) = Priority::parse(&item.priority) else {
        return TaskActionResponse::failure(
            "invalid_argument",
            format!("task_update failed: unknown priority `{}`", item.priority),
        );
    };

    let task = Task {
        id: item.id,
        title: item.title,
        description: item.description,
        priority,
        is_important: item.is_important,
        is_urgent: item.is_urgent,
        is_completed: item.is_completed,
        due_at: item.due_at_ms,
    };

    let result = with_session(|session| {
        session.controller.update_task(task.clone()).wait()?;
        session.await_published("task_update", |tasks| tasks.contains(&task));
        Ok(())
    });

    match result {
        Ok(()) => TaskActionResponse::success(
            "Task updated.",
            Some(to_item(&task, now_epoch_ms())),
        ),
        Err(err) => TaskActionResponse::from_store_error("task_update", &err),
    }
}

/// Sets the completion flag of one task, keeping its other fields.
#[flutter_rust_bridge::frb(sync)]
pub fn task_set_completed(id: i64, completed: bool) -> TaskActionResponse {
    let result = with_session(|session| {
        let mut task = session.find(id)?;
        task.is_completed = completed;
        session.controller.update_task(task.clone()).wait()?;
        session.await_published("task_set_completed", |tasks| tasks.contains(&task));
        Ok(task)
    });

    match result {
        Ok(task) => TaskActionResponse::success(
            "Task updated.",
            Some(to_item(&task, now_epoch_ms())),
        ),
        Err(err) => TaskActionResponse::from_store_error("task_set_completed", &err),
    }
}

/// Deletes one task. Unknown ids fail with `not_found`.
#[flutter_rust_bridge::frb(sync)]
pub fn task_delete(id: i64) -> TaskActionResponse {
    let result = with_session(|session| {
        let task = session.find(id)?;
        session.controller.delete_task(task).wait()?;
        session.await_published("task_delete", |tasks| {
            tasks.iter().all(|listed| listed.id != id)
        });
        Ok(())
    });

    match result {
        Ok(()) => TaskActionResponse::success("Task deleted.", None),
        Err(err) => TaskActionResponse::from_store_error("task_delete", &err),
    }
}

/// All tasks ordered by priority, newest first within a priority.
#[flutter_rust_bridge::frb(sync)]
pub fn task_list() -> TaskListResponse {
    match with_session(|session| Ok(session.tasks())) {
        Ok(tasks) => {
            let now_ms = now_epoch_ms();
            let items: Vec<TaskItem> = tasks.iter().map(|task| to_item(task, now_ms)).collect();
            let message = format!("{} task(s).", items.len());
            TaskListResponse { items, message }
        }
        Err(err) => TaskListResponse {
            items: Vec::new(),
            message: format!("task_list failed: {err}"),
        },
    }
}

/// Filtered tasks grouped into the four quadrants.
#[flutter_rust_bridge::frb(sync)]
pub fn matrix_view(show_completed: bool, search_query: String) -> MatrixResponse {
    let tasks = match with_session(|session| Ok(session.tasks())) {
        Ok(tasks) => tasks,
        Err(err) => {
            return MatrixResponse {
                quadrants: Vec::new(),
                total: 0,
                message: format!("matrix_view failed: {err}"),
            };
        }
    };

    let view = classify(&tasks, &MatrixFilter::new(show_completed, search_query));
    let now_ms = now_epoch_ms();
    let quadrants = view
        .iter()
        .map(|(quadrant, bucket)| QuadrantGroup {
            key: quadrant.as_str().to_string(),
            label: quadrant.label().to_string(),
            items: bucket.iter().map(|task| to_item(task, now_ms)).collect(),
        })
        .collect();
    let total = u32::try_from(view.total()).unwrap_or(u32::MAX);

    MatrixResponse {
        quadrants,
        total,
        message: format!("Priority Matrix ({total})"),
    }
}

fn with_session<T>(
    f: impl FnOnce(&Session) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let session = SESSION.get_or_try_init(|| {
        let store = TaskStore::open(CoreConfig::from_env().db_path)?;
        let controller = TaskListController::new(Arc::new(store));
        let observer = Mutex::new(controller.observe());
        Ok::<_, StoreError>(Session {
            controller,
            observer,
        })
    })?;
    f(session)
}

fn to_item(task: &Task, now_ms: i64) -> TaskItem {
    TaskItem {
        id: task.id,
        title: task.title.clone(),
        description: task.description.clone(),
        priority: task.priority.as_str().to_string(),
        is_important: task.is_important,
        is_urgent: task.is_urgent,
        is_completed: task.is_completed,
        due_at_ms: task.due_at,
        is_overdue: task.is_overdue_at(now_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, init_logging, matrix_view, ping, task_add, task_delete, task_list,
        task_set_completed, task_update,
    };
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        format!("{prefix}-{nanos}")
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "/tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn task_add_places_task_in_requested_quadrant() {
        let title = unique_token("quadrant");
        let created = task_add(
            title.clone(),
            String::new(),
            "HIGH".to_string(),
            "urgent_not_important".to_string(),
            Some(1_000),
        );
        assert!(created.ok, "{}", created.message);
        let item = created.task.expect("created task");
        assert_eq!(item.priority, "high");
        assert!(item.is_overdue);

        let view = matrix_view(true, title);
        assert_eq!(view.total, 1);
        assert_eq!(view.quadrants.len(), 4);
        let group = &view.quadrants[2];
        assert_eq!(group.key, "urgent_not_important");
        assert_eq!(group.items[0].id, item.id);
    }

    #[test]
    fn task_add_rejects_blank_title_and_unknown_enums() {
        let blank = task_add(
            "  ".to_string(),
            String::new(),
            "low".to_string(),
            "neither".to_string(),
            None,
        );
        assert!(!blank.ok);
        assert_eq!(blank.error_code.as_deref(), Some("validation_failed"));

        let bad_priority = task_add(
            "x".to_string(),
            String::new(),
            "urgent".to_string(),
            "neither".to_string(),
            None,
        );
        assert_eq!(bad_priority.error_code.as_deref(), Some("invalid_argument"));

        let bad_quadrant = task_add(
            "x".to_string(),
            String::new(),
            "low".to_string(),
            "q5".to_string(),
            None,
        );
        assert_eq!(bad_quadrant.error_code.as_deref(), Some("invalid_argument"));
    }

    #[test]
    fn task_add_keeps_title_as_entered() {
        let token = unique_token("padded");
        let created = task_add(
            format!("  {token}  "),
            String::new(),
            "low".to_string(),
            "neither".to_string(),
            None,
        );
        assert!(created.ok, "{}", created.message);
        assert_eq!(created.task.expect("created task").title, format!("  {token}  "));

        let view = matrix_view(true, token.clone());
        assert_eq!(view.quadrants[3].items[0].title, format!("  {token}  "));
    }

    #[test]
    fn commands_are_visible_to_the_next_read() {
        let title = unique_token("visible");
        let id = task_add(
            title.clone(),
            String::new(),
            "medium".to_string(),
            "important_not_urgent".to_string(),
            None,
        )
        .task
        .expect("created task")
        .id;
        assert!(task_list().items.iter().any(|item| item.id == id));

        assert!(task_delete(id).ok);
        assert!(task_list().items.iter().all(|item| item.id != id));
        assert_eq!(matrix_view(true, title).total, 0);
    }

    #[test]
    fn completion_update_and_delete_round_trip() {
        let title = unique_token("lifecycle");
        let created = task_add(
            title.clone(),
            "desc".to_string(),
            "medium".to_string(),
            "neither".to_string(),
            None,
        );
        let id = created.task.expect("created task").id;

        let completed = task_set_completed(id, true);
        assert!(completed.ok, "{}", completed.message);
        assert!(matrix_view(false, title.clone()).quadrants[3].items.is_empty());

        let mut item = completed.task.expect("updated task");
        item.description = "edited".to_string();
        let updated = task_update(item);
        assert!(updated.ok, "{}", updated.message);
        let listed = task_list()
            .items
            .into_iter()
            .find(|item| item.id == id)
            .expect("task listed");
        assert_eq!(listed.description, "edited");
        assert!(listed.is_completed);

        assert!(task_delete(id).ok);
        let missing = task_delete(id);
        assert!(!missing.ok);
        assert_eq!(missing.error_code.as_deref(), Some("not_found"));
    }
}
