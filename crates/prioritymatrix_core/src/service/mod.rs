//! Use-case layer between presentation and the task store.
//!
//! # Responsibility
//! - Hold the presentation-facing task list state.
//! - Forward user commands to the store off the caller's thread.

pub mod task_list_controller;
