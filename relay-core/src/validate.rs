//! Trigger parameter validation
//!
//! Runs before any network call and on every edit of the trigger definition.
//! Never fails: problems are returned as a map of parameter name to message,
//! and an empty map means the parameters are valid.

use std::collections::BTreeMap;

use crate::archive::{ARCHIVE_EXTENSIONS, has_archive_extension};
use crate::domain::trigger::uses_default_chain;
use crate::params::{self, Params};

/// Validates trigger parameters
///
/// With `accept_references` set, values that still hold an unresolved
/// `%reference%` skip their format checks; they are checked again once resolved.
pub fn validate_settings(params: &Params, accept_references: bool) -> BTreeMap<String, String> {
    let mut invalids = validate_connectivity(params, accept_references);

    if params::action_token(params).is_none() {
        invalids.insert(
            params::ACTION_TOKEN_PARAM.to_string(),
            format!("{} parameter must not be empty", params::ACTION_TOKEN_LABEL),
        );
    }

    let specs = params::output_path_specs(params);
    if specs.len() > params::MAX_OUTPUT_PATH_SPECS {
        invalids.insert(
            params::ARTIFACT_OUTPUT_PATHS_PARAM.to_string(),
            format!(
                "At most {} output artifact paths can be specified, got {}",
                params::MAX_OUTPUT_PATH_SPECS,
                specs.len()
            ),
        );
    } else if let Some(bad) = specs.iter().find(|spec| {
        !(accept_references && params::is_reference(spec)) && !has_archive_extension(spec)
    }) {
        invalids.insert(
            params::ARTIFACT_OUTPUT_PATHS_PARAM.to_string(),
            format!(
                "Output artifact path {} must have one of the extensions: {}",
                bad,
                ARCHIVE_EXTENSIONS.join(", ")
            ),
        );
    }

    invalids
}

/// Base connectivity and authentication checks shared by every trigger
fn validate_connectivity(params: &Params, accept_references: bool) -> BTreeMap<String, String> {
    let mut invalids = BTreeMap::new();
    let require = |invalids: &mut BTreeMap<String, String>, key: &str, label: &str| {
        let present = params.get(key).is_some_and(|v| !v.trim().is_empty());
        if !present {
            invalids.insert(key.to_string(), format!("{} must not be empty", label));
        }
    };

    require(&mut invalids, params::REGION_NAME_PARAM, "AWS region");
    if uses_default_chain(params) {
        return invalids;
    }

    match params.get(params::CREDENTIALS_TYPE_PARAM).map(String::as_str) {
        Some(params::ACCESS_KEYS_TYPE) => {
            require(&mut invalids, params::ACCESS_KEY_ID_PARAM, "Access key ID");
            require(&mut invalids, params::SECRET_ACCESS_KEY_PARAM, "Secret access key");
        }
        Some(params::TEMP_CREDENTIALS_TYPE) => {
            require(&mut invalids, params::IAM_ROLE_ARN_PARAM, "IAM role ARN");
        }
        Some(other) if accept_references && params::is_reference(other) => {}
        Some(other) => {
            invalids.insert(
                params::CREDENTIALS_TYPE_PARAM.to_string(),
                format!("Unsupported credentials type: {}", other),
            );
        }
        None => {
            invalids.insert(
                params::CREDENTIALS_TYPE_PARAM.to_string(),
                "Credentials type must not be empty".to_string(),
            );
        }
    }

    invalids
}
