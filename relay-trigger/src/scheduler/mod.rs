//! Scheduler layer for the trigger
//!
//! Polls the orchestrator for new jobs and moves each received job through
//! acknowledgment and build dispatch.

pub mod poller;
pub mod state;

pub use poller::JobPoller;
