//! Repository layer over the `tasks` table.
//!
//! # Responsibility
//! - Define the task data access contract.
//! - Keep SQL details out of the store and controller.
//!
//! # Invariants
//! - Writes validate the task before touching SQL.
//! - Update and delete report `NotFound` when no row matched.

pub mod task_repo;
