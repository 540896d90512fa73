//! Task store: the single owner of durable task state.
//!
//! # Responsibility
//! - Serialize every mutation through one SQLite connection.
//! - Push a full ordered snapshot to all subscribers after each mutation.
//!
//! # Invariants
//! - A failed mutation leaves the database unchanged and emits nothing.
//! - Subscribers receive snapshots in the order mutations were applied.

mod subscription;
pub mod task_store;

pub use subscription::TaskSubscription;
pub use task_store::{StoreError, StoreResult, TaskSnapshot, TaskStore};
