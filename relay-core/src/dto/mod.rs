//! Data Transfer Objects for the orchestrator API
//!
//! Request and response bodies exchanged with the pipeline orchestrator.
//! Field names follow the orchestrator's JSON protocol (camelCase).

pub mod action;
pub mod job;
