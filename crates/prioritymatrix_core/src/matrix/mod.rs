//! Priority matrix projection of the task list.

pub mod classifier;
