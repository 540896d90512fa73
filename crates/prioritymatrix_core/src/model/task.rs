//! Task domain model.
//!
//! # Responsibility
//! - Define the task record shared by the store, controller and classifier.
//! - Provide validation and the derived overdue predicate.
//!
//! # Invariants
//! - `id` is assigned by the store on insert and never changes afterwards.
//! - `title` must not be blank after trimming.
//! - `due_at` is Unix epoch milliseconds; `None` means no deadline.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Store-assigned task identifier.
pub type TaskId = i64;

/// Ordered task priority. `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// All priorities in ascending order.
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    /// Stable lowercase name used by logs and the FFI boundary.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parses a case-insensitive priority name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// One cell of the importance/urgency matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quadrant {
    /// Q1: do first.
    ImportantUrgent,
    /// Q2: schedule.
    ImportantNotUrgent,
    /// Q3: delegate.
    UrgentNotImportant,
    /// Q4: drop.
    Neither,
}

impl Quadrant {
    /// Quadrants in display order (Q1..Q4).
    pub const ALL: [Quadrant; 4] = [
        Quadrant::ImportantUrgent,
        Quadrant::ImportantNotUrgent,
        Quadrant::UrgentNotImportant,
        Quadrant::Neither,
    ];

    /// Maps a flag pair to its quadrant.
    pub fn of(is_important: bool, is_urgent: bool) -> Self {
        match (is_important, is_urgent) {
            (true, true) => Self::ImportantUrgent,
            (true, false) => Self::ImportantNotUrgent,
            (false, true) => Self::UrgentNotImportant,
            (false, false) => Self::Neither,
        }
    }

    /// Returns `(is_important, is_urgent)` for this quadrant.
    pub fn flags(self) -> (bool, bool) {
        match self {
            Self::ImportantUrgent => (true, true),
            Self::ImportantNotUrgent => (true, false),
            Self::UrgentNotImportant => (false, true),
            Self::Neither => (false, false),
        }
    }

    /// Stable snake_case name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ImportantUrgent => "important_urgent",
            Self::ImportantNotUrgent => "important_not_urgent",
            Self::UrgentNotImportant => "urgent_not_important",
            Self::Neither => "neither",
        }
    }

    /// Human-readable quadrant heading.
    pub fn label(self) -> &'static str {
        match self {
            Self::ImportantUrgent => "Important & Urgent",
            Self::ImportantNotUrgent => "Important & Not Urgent",
            Self::UrgentNotImportant => "Not Important & Urgent",
            Self::Neither => "Not Important & Not Urgent",
        }
    }

    /// Parses the snake_case wire name.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|quadrant| quadrant.as_str() == value)
    }
}

/// Validation errors for task drafts and stored tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Title is empty or whitespace only.
    BlankTitle,
    /// Id was not assigned by the store.
    InvalidId(TaskId),
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "task title must not be blank"),
            Self::InvalidId(id) => write!(f, "task id must be positive, got {id}"),
        }
    }
}

impl Error for TaskValidationError {}

/// Task fields supplied by the caller before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub is_important: bool,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default)]
    pub is_completed: bool,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub due_at: Option<i64>,
}

impl TaskDraft {
    /// Creates a draft with medium priority, no flags and no deadline.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority: Priority::default(),
            is_important: false,
            is_urgent: false,
            is_completed: false,
            due_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets both flags from a quadrant choice.
    pub fn in_quadrant(mut self, quadrant: Quadrant) -> Self {
        let (is_important, is_urgent) = quadrant.flags();
        self.is_important = is_important;
        self.is_urgent = is_urgent;
        self
    }

    pub fn due_at(mut self, due_at: Option<i64>) -> Self {
        self.due_at = due_at;
        self
    }

    /// Checks caller-supplied fields before persistence.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::BlankTitle);
        }
        Ok(())
    }

    /// Binds this draft to a store-assigned id.
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            priority: self.priority,
            is_important: self.is_important,
            is_urgent: self.is_urgent,
            is_completed: self.is_completed,
            due_at: self.due_at,
        }
    }
}

/// Persisted task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub is_important: bool,
    pub is_urgent: bool,
    pub is_completed: bool,
    /// Unix epoch milliseconds.
    pub due_at: Option<i64>,
}

impl Task {
    /// Validates identity and caller-supplied fields.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.id <= 0 {
            return Err(TaskValidationError::InvalidId(self.id));
        }
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::BlankTitle);
        }
        Ok(())
    }

    /// Quadrant derived from `is_important` and `is_urgent`.
    pub fn quadrant(&self) -> Quadrant {
        Quadrant::of(self.is_important, self.is_urgent)
    }

    /// Returns whether the deadline is strictly before `now_ms`.
    ///
    /// Completion is not considered: a finished task past its deadline is
    /// still reported as overdue.
    pub fn is_overdue_at(&self, now_ms: i64) -> bool {
        matches!(self.due_at, Some(due_at) if due_at < now_ms)
    }

    /// [`Task::is_overdue_at`] against the wall clock.
    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(now_epoch_ms())
    }

    /// Copy of this task with `is_completed` flipped.
    pub fn toggled_completed(&self) -> Self {
        Self {
            is_completed: !self.is_completed,
            ..self.clone()
        }
    }
}

/// Current wall-clock time as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
