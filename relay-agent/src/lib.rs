//! Relay Agent
//!
//! Build-side half of the pipeline relay. A build queued by the trigger
//! carries the job id in its parameters; the listener picks it up, stages
//! the job's input artifacts before the first build step, and publishes the
//! outputs and the outcome right before the build finishes.
//!
//! The host build engine drives [`BuildListener`] through its lifecycle hooks
//! and exposes the running build through [`AgentBuild`].

pub mod build;
pub mod context;
pub mod listener;
pub mod publisher;
pub mod resolver;
pub mod stager;

// Re-export traits
pub use build::{AgentBuild, BuildLog};
pub use resolver::OutputResolver;
pub use stager::ObjectStoreFactory;

// Re-export implementations
pub use build::{BuildFinishedStatus, InMemoryBuildLog, RunningBuild};
pub use context::{JobExecutionContext, Phase};
pub use listener::BuildListener;
pub use publisher::ResultPublisher;
pub use resolver::{OutputScope, OutputStrategy, PathSpec};
pub use stager::{ArtifactStager, FixedObjectStore, InputLayout};
