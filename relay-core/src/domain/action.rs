//! Action type domain model
//!
//! An action type identifies the kind of pipeline action jobs are polled for.
//! The relay always polls as a custom build action of a fixed provider; only
//! the version is looked up at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::params::ACTION_PROVIDER;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionCategory {
    Source,
    Build,
    Deploy,
    Test,
    Invoke,
    Approval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOwner {
    #[serde(rename = "AWS")]
    Aws,
    ThirdParty,
    Custom,
}

/// Fully qualified action identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTypeId {
    pub category: ActionCategory,
    pub owner: ActionOwner,
    pub provider: String,
    pub version: String,
}

impl ActionTypeId {
    /// The identity this relay polls for: a custom build action of our provider
    pub fn custom_build(version: impl Into<String>) -> Self {
        Self {
            category: ActionCategory::Build,
            owner: ActionOwner::Custom,
            provider: ACTION_PROVIDER.to_string(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ActionTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{:?}/{}@{}",
            self.category, self.owner, self.provider, self.version
        )
    }
}

/// A registered action type as listed by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionType {
    pub id: ActionTypeId,
}
