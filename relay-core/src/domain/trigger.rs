//! Trigger configuration
//!
//! Typed view over the flat parameter map of a trigger definition. Only ever
//! built from parameters that passed validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::{RelayError, Result};
use crate::params::{self, Params};
use crate::validate::validate_settings;

/// How the relay authenticates against the orchestrator
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialsKind {
    AccessKeys {
        access_key_id: String,
        secret_access_key: String,
    },
    TemporaryCredentials {
        role_arn: String,
    },
    DefaultProviderChain,
}

impl fmt::Debug for CredentialsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsKind::AccessKeys { access_key_id, .. } => f
                .debug_struct("AccessKeys")
                .field("access_key_id", access_key_id)
                .finish_non_exhaustive(),
            CredentialsKind::TemporaryCredentials { role_arn } => f
                .debug_struct("TemporaryCredentials")
                .field("role_arn", role_arn)
                .finish(),
            CredentialsKind::DefaultProviderChain => write!(f, "DefaultProviderChain"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub region: String,
    pub kind: CredentialsKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerConfig {
    pub credentials: Credentials,
    /// Poll interval override from the trigger itself, if any
    pub poll_interval: Option<Duration>,
    pub action_token: String,
    /// Explicit local paths for output artifacts, in declaration order
    pub artifact_path_specs: Vec<String>,
}

impl TriggerConfig {
    /// Validates the parameters and builds the typed configuration
    ///
    /// References are not accepted here: by the time a trigger polls, every
    /// value must be resolved.
    pub fn from_params(params: &Params) -> Result<Self> {
        let invalids = validate_settings(params, false);
        if !invalids.is_empty() {
            let message = invalids.values().cloned().collect::<Vec<_>>().join("\n");
            return Err(RelayError::configuration(message));
        }

        let region = params::region(params).unwrap_or_default().to_string();
        let kind = credentials_kind(params);
        let action_token = params::action_token(params)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            credentials: Credentials { region, kind },
            poll_interval: params
                .get(params::POLL_INTERVAL_PARAM)
                .and_then(|v| parse_poll_interval(v)),
            action_token,
            artifact_path_specs: params::output_path_specs(params),
        })
    }
}

/// A trigger definition as stored on disk
///
/// `parameters` are the trigger's own properties; `build_parameters` are the
/// configuration parameters of the build the trigger belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub parameters: Params,
    #[serde(default)]
    pub build_parameters: Params,
}

impl TriggerDefinition {
    /// Reads a definition from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| RelayError::io(format!("Failed to read {}", path.display()), e))?;
        serde_json::from_str(&text).map_err(|e| {
            RelayError::configuration(format!(
                "Invalid trigger definition {}: {}",
                path.display(),
                e
            ))
        })
    }
}

/// Parses a poll interval override: a positive whole number of seconds
pub fn parse_poll_interval(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

fn credentials_kind(params: &Params) -> CredentialsKind {
    let get = |key: &str| params.get(key).cloned().unwrap_or_default();

    if uses_default_chain(params) {
        return CredentialsKind::DefaultProviderChain;
    }
    match params.get(params::CREDENTIALS_TYPE_PARAM).map(String::as_str) {
        Some(params::TEMP_CREDENTIALS_TYPE) => CredentialsKind::TemporaryCredentials {
            role_arn: get(params::IAM_ROLE_ARN_PARAM),
        },
        _ => CredentialsKind::AccessKeys {
            access_key_id: get(params::ACCESS_KEY_ID_PARAM),
            secret_access_key: get(params::SECRET_ACCESS_KEY_PARAM),
        },
    }
}

pub(crate) fn uses_default_chain(params: &Params) -> bool {
    params
        .get(params::USE_DEFAULT_CREDENTIAL_PROVIDER_CHAIN_PARAM)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}
