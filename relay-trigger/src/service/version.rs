//! Action type version resolution
//!
//! Jobs are polled for a fully qualified action identity, so the version of
//! our custom action must be looked up in the orchestrator's registry first.

use relay_client::PipelineApi;
use relay_core::domain::action::{ActionOwner, ActionType};
use relay_core::params::{ACTION_PROVIDER, DEFAULT_ACTION_VERSION};
use relay_core::{RelayError, Result};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// What to do when no action type of our provider is registered
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VersionPolicy {
    /// Fail the poll cycle with a configuration error
    #[default]
    Strict,
    /// Poll with this version anyway
    Fallback(String),
}

impl FromStr for VersionPolicy {
    type Err = String;

    /// Accepts `strict`, `fallback` (default version) or `fallback:<version>`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once(':') {
            None if s.eq_ignore_ascii_case("strict") => Ok(Self::Strict),
            None if s.eq_ignore_ascii_case("fallback") => {
                Ok(Self::Fallback(DEFAULT_ACTION_VERSION.to_string()))
            }
            Some((kind, version)) if kind.eq_ignore_ascii_case("fallback") => {
                let version = version.trim();
                if version.is_empty() {
                    return Err("fallback version must not be empty".to_string());
                }
                Ok(Self::Fallback(version.to_string()))
            }
            _ => Err(format!(
                "unknown version policy '{}', expected 'strict' or 'fallback:<version>'",
                s
            )),
        }
    }
}

impl fmt::Display for VersionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionPolicy::Strict => write!(f, "strict"),
            VersionPolicy::Fallback(version) => write!(f, "fallback:{}", version),
        }
    }
}

/// Looks up the registered version of our custom action type
#[derive(Debug, Clone, Default)]
pub struct VersionResolver {
    policy: VersionPolicy,
}

impl VersionResolver {
    pub fn new(policy: VersionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &VersionPolicy {
        &self.policy
    }

    /// Resolves the version to poll with
    ///
    /// The first custom action type of our provider in listing order wins.
    pub async fn resolve(&self, api: &dyn PipelineApi) -> Result<String> {
        let action_types = api.list_action_types(ActionOwner::Custom).await?;

        if let Some(version) = find_version(&action_types) {
            return Ok(version.to_string());
        }

        match &self.policy {
            VersionPolicy::Strict => Err(RelayError::configuration(format!(
                "No registered {} action type found in the AWS account",
                ACTION_PROVIDER
            ))),
            VersionPolicy::Fallback(version) => {
                warn!(
                    "No registered {} action type found, polling with version {}",
                    ACTION_PROVIDER, version
                );
                Ok(version.clone())
            }
        }
    }
}

fn find_version(action_types: &[ActionType]) -> Option<&str> {
    action_types
        .iter()
        .find(|t| t.id.provider == ACTION_PROVIDER)
        .map(|t| t.id.version.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_client::mock::RecordingPipelineApi;
    use relay_core::domain::action::ActionTypeId;

    fn action_type(provider: &str, version: &str) -> ActionType {
        let mut id = ActionTypeId::custom_build(version);
        id.provider = provider.to_string();
        ActionType { id }
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!("strict".parse::<VersionPolicy>(), Ok(VersionPolicy::Strict));
        assert_eq!(
            "fallback".parse::<VersionPolicy>(),
            Ok(VersionPolicy::Fallback("1".to_string()))
        );
        assert_eq!(
            "fallback: 4 ".parse::<VersionPolicy>(),
            Ok(VersionPolicy::Fallback("4".to_string()))
        );
        assert!("fallback:".parse::<VersionPolicy>().is_err());
        assert!("lenient".parse::<VersionPolicy>().is_err());
        assert_eq!(VersionPolicy::Fallback("2".to_string()).to_string(), "fallback:2");
    }

    #[tokio::test]
    async fn test_first_match_in_listing_order() {
        let api = RecordingPipelineApi::new();
        api.set_action_types(vec![
            action_type("Jenkins", "7"),
            action_type("TeamCity", "3"),
            action_type("TeamCity", "5"),
        ]);

        let version = VersionResolver::default().resolve(&api).await.unwrap();
        assert_eq!(version, "3");
    }

    #[tokio::test]
    async fn test_strict_policy_fails_without_match() {
        let api = RecordingPipelineApi::new();
        api.set_action_types(vec![action_type("Jenkins", "7")]);

        let err = VersionResolver::new(VersionPolicy::Strict)
            .resolve(&api)
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(
            err.to_string(),
            "No registered TeamCity action type found in the AWS account"
        );
    }

    #[tokio::test]
    async fn test_fallback_policy_uses_default() {
        let api = RecordingPipelineApi::new();

        let version = VersionResolver::new(VersionPolicy::Fallback("1".to_string()))
            .resolve(&api)
            .await
            .unwrap();
        assert_eq!(version, "1");
    }
}
