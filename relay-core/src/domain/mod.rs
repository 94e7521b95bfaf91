//! Core domain types
//!
//! These types represent the entities the relay works with. Jobs and action
//! types are owned by the orchestrator and received read-only; the trigger
//! configuration is owned by the trigger definition; build problems are
//! produced on the build side.

pub mod action;
pub mod job;
pub mod log;
pub mod problem;
pub mod trigger;
