//! Core domain logic for the priority matrix task manager.
//! This crate is the single source of truth for task invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod matrix;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use matrix::classifier::{classify, overdue_at, MatrixFilter, MatrixView};
pub use model::task::{
    now_epoch_ms, Priority, Quadrant, Task, TaskDraft, TaskId, TaskValidationError,
};
pub use repo::task_repo::{RepoError, RepoResult, SqliteTaskRepository, TaskRepository};
pub use service::task_list_controller::{CommandHandle, TaskListController, TaskListObserver};
pub use store::{StoreError, StoreResult, TaskSnapshot, TaskStore, TaskSubscription};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
