//! Relay Core
//!
//! Core types and pure logic shared by the trigger (server side) and the
//! agent (build side) of the pipeline relay.
//!
//! This crate contains:
//! - Domain types: Job, artifacts, action types, trigger configuration, build problems
//! - DTOs: wire structures exchanged with the pipeline orchestrator
//! - Parameter names, defaults and validation
//! - Archive extension inference
//! - The error taxonomy used across the workspace

pub mod archive;
pub mod domain;
pub mod dto;
pub mod error;
pub mod params;
pub mod validate;

pub use error::{RelayError, Result};
