//! Service layer
//!
//! Collaborators the poller drives: the build server's queue and the action
//! type registry lookup. Both sit behind types that tests can replace.

mod build_queue;
mod version;

// Re-export traits
pub use build_queue::{BuildBackend, BuildCustomizer, BuildPromotion};

// Re-export implementations
pub use build_queue::HttpBuildQueue;
pub use version::{VersionPolicy, VersionResolver};

#[cfg(test)]
pub(crate) use build_queue::testing;
