//! Domain model for the priority matrix.
//!
//! # Responsibility
//! - Define the canonical task record and its creation draft.
//! - Define the importance/urgency quadrants derived from task flags.
//!
//! # Invariants
//! - Every persisted task is identified by a store-assigned `TaskId`.
//! - Quadrant membership is derived from flags, never stored.
//! - Deletion is a hard delete; there are no tombstones.

pub mod task;
