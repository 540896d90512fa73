//! Quadrant classification of a task list.
//!
//! # Responsibility
//! - Filter tasks by completion and a free-text query.
//! - Split the filtered tasks into the four importance/urgency quadrants.
//!
//! # Invariants
//! - Pure: no I/O, no clock, same input gives the same output.
//! - Every kept task lands in exactly one bucket.
//! - Input order is preserved inside each bucket.

use crate::model::task::{Quadrant, Task};

/// User-controlled filter applied before partitioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixFilter {
    pub show_completed: bool,
    /// Case-insensitive substring matched against title and description,
    /// comparing one char at a time. Blank means no text filter.
    pub search_query: String,
}

impl Default for MatrixFilter {
    fn default() -> Self {
        Self {
            show_completed: true,
            search_query: String::new(),
        }
    }
}

impl MatrixFilter {
    pub fn new(show_completed: bool, search_query: impl Into<String>) -> Self {
        Self {
            show_completed,
            search_query: search_query.into(),
        }
    }

    /// Returns whether `task` passes this filter.
    pub fn matches(&self, task: &Task) -> bool {
        if !self.show_completed && task.is_completed {
            return false;
        }
        if self.search_query.trim().is_empty() {
            return true;
        }
        contains_ignore_case(&task.title, &self.search_query)
            || contains_ignore_case(&task.description, &self.search_query)
    }
}

/// Substring search with pairwise char comparison; case mapping never changes
/// the length of either side.
fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() {
        return true;
    }
    let haystack: Vec<char> = haystack.chars().collect();
    haystack.windows(needle.len()).any(|window| {
        window
            .iter()
            .zip(&needle)
            .all(|(left, right)| chars_eq_ignore_case(*left, *right))
    })
}

fn chars_eq_ignore_case(left: char, right: char) -> bool {
    left == right
        || single_upper(left) == single_upper(right)
        || single_lower(left) == single_lower(right)
}

/// Uppercase form when it is one char (`ß` stays `ß`).
fn single_upper(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(mapped), None) => mapped,
        _ => c,
    }
}

/// Leading char of the lowercase form (`İ` becomes `i`).
fn single_lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Filtered tasks grouped by quadrant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixView {
    important_urgent: Vec<Task>,
    important_not_urgent: Vec<Task>,
    urgent_not_important: Vec<Task>,
    neither: Vec<Task>,
}

impl MatrixView {
    /// Tasks in `quadrant`, in input order.
    pub fn bucket(&self, quadrant: Quadrant) -> &[Task] {
        match quadrant {
            Quadrant::ImportantUrgent => &self.important_urgent,
            Quadrant::ImportantNotUrgent => &self.important_not_urgent,
            Quadrant::UrgentNotImportant => &self.urgent_not_important,
            Quadrant::Neither => &self.neither,
        }
    }

    /// Number of tasks that passed the filter.
    pub fn total(&self) -> usize {
        Quadrant::ALL
            .iter()
            .map(|quadrant| self.bucket(*quadrant).len())
            .sum()
    }

    /// Buckets in Q1..Q4 order.
    pub fn iter(&self) -> impl Iterator<Item = (Quadrant, &[Task])> + '_ {
        Quadrant::ALL
            .into_iter()
            .map(move |quadrant| (quadrant, self.bucket(quadrant)))
    }

    /// All kept tasks, bucket by bucket.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.iter().flat_map(|(_, tasks)| tasks.iter())
    }

    fn bucket_mut(&mut self, quadrant: Quadrant) -> &mut Vec<Task> {
        match quadrant {
            Quadrant::ImportantUrgent => &mut self.important_urgent,
            Quadrant::ImportantNotUrgent => &mut self.important_not_urgent,
            Quadrant::UrgentNotImportant => &mut self.urgent_not_important,
            Quadrant::Neither => &mut self.neither,
        }
    }
}

/// Filters `tasks` and partitions the survivors by quadrant in one pass.
pub fn classify(tasks: &[Task], filter: &MatrixFilter) -> MatrixView {
    let mut view = MatrixView::default();
    for task in tasks.iter().filter(|task| filter.matches(task)) {
        view.bucket_mut(task.quadrant()).push(task.clone());
    }
    view
}

/// Tasks whose deadline is strictly before `now_ms`, in input order.
pub fn overdue_at(tasks: &[Task], now_ms: i64) -> Vec<&Task> {
    tasks.iter().filter(|task| task.is_overdue_at(now_ms)).collect()
}
