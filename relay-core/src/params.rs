//! Parameter names and defaults
//!
//! Trigger and build parameters are flat string maps. The names below are the
//! keys the trigger definition, the build configuration and the agent agree on.

use std::collections::BTreeMap;

/// Flat parameter map as stored on a trigger or a build
pub type Params = BTreeMap<String, String>;

pub const TRIGGER_DISPLAY_NAME: &str = "AWS CodePipeline Action";
pub const TRIGGER_DESCRIPTION: &str = "Poll AWS CodePipeline for job requests";

/// Provider name the custom action type is registered under
pub const ACTION_PROVIDER: &str = "TeamCity";
/// Query parameter key carrying the action token in poll requests
pub const ACTION_TOKEN_QUERY_PARAM: &str = "ActionID";
pub const DEFAULT_ACTION_VERSION: &str = "1";

pub const ACTION_TOKEN_PARAM: &str = "codepipeline_action_tocken";
pub const ACTION_TOKEN_LABEL: &str = "ActionID";
pub const JOB_ID_PARAM: &str = "codepipeline.job.id";
pub const POLL_INTERVAL_PARAM: &str = "codepipeline.poll.interval";
pub const ARTIFACT_INPUT_FOLDER_PARAM: &str = "codepipeline.artifact.input.folder";
pub const ARTIFACT_OUTPUT_FOLDER_PARAM: &str = "codepipeline.artifact.output.folder";
pub const ARTIFACT_OUTPUT_PATHS_PARAM: &str = "codepipeline.artifact.output.paths";

pub const BUILD_TEMP_DIR_REF: &str = "%system.teamcity.build.tempDir%";
pub const DEFAULT_ARTIFACT_INPUT_FOLDER: &str =
    "%system.teamcity.build.tempDir%/CodePipeline/input";
pub const DEFAULT_ARTIFACT_OUTPUT_FOLDER: &str =
    "%system.teamcity.build.tempDir%/CodePipeline/output";

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 20;
pub const MAX_OUTPUT_PATH_SPECS: usize = 5;

// Base connectivity parameters
pub const REGION_NAME_PARAM: &str = "aws.region.name";
pub const CREDENTIALS_TYPE_PARAM: &str = "aws.credentials.type";
pub const ACCESS_KEYS_TYPE: &str = "aws.access.keys";
pub const TEMP_CREDENTIALS_TYPE: &str = "aws.temp.credentials";
pub const USE_DEFAULT_CREDENTIAL_PROVIDER_CHAIN_PARAM: &str =
    "aws.use.default.credential.provider.chain";
pub const ACCESS_KEY_ID_PARAM: &str = "aws.access.key.id";
pub const SECRET_ACCESS_KEY_PARAM: &str = "secure:aws.secret.access.key";
pub const IAM_ROLE_ARN_PARAM: &str = "aws.iam.role.arn";

pub fn job_id(params: &Params) -> Option<&str> {
    non_empty(params, JOB_ID_PARAM)
}

pub fn action_token(params: &Params) -> Option<&str> {
    non_empty(params, ACTION_TOKEN_PARAM)
}

pub fn region(params: &Params) -> Option<&str> {
    non_empty(params, REGION_NAME_PARAM)
}

/// Explicit output artifact path specs, in declaration order
///
/// Specs are separated by newlines or commas; blank entries are skipped.
pub fn output_path_specs(params: &Params) -> Vec<String> {
    params
        .get(ARTIFACT_OUTPUT_PATHS_PARAM)
        .map(|value| {
            value
                .split(['\n', ','])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Whether the value still contains an unresolved `%name%` reference
pub fn is_reference(value: &str) -> bool {
    let Some(start) = value.find('%') else {
        return false;
    };
    value[start + 1..].find('%').is_some_and(|len| len > 0)
}

fn non_empty<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}

/// Human readable trigger description shown next to the trigger definition
pub fn describe_trigger(params: &Params) -> String {
    format!(
        "{} with {} {}",
        TRIGGER_DESCRIPTION,
        action_token(params).unwrap_or_default(),
        ACTION_TOKEN_QUERY_PARAM
    )
}
