//! UI-facing bindings for the priority matrix core.

pub mod api;
