//! Trigger process configuration
//!
//! Defines where the trigger finds the orchestrator, the build server and
//! the trigger definition it polls for.

use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;

use crate::service::VersionPolicy;
use relay_core::params::DEFAULT_POLL_INTERVAL_SECS;

/// Trigger process settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Orchestrator endpoint; the regional endpoint is used when unset
    pub orchestrator_url: Option<String>,

    /// Bearer token sent to the orchestrator endpoint, if any
    pub orchestrator_token: Option<String>,

    /// Build server base URL (e.g., "http://localhost:8111")
    pub build_server_url: String,

    /// Bearer token for the build server's REST API, if any
    pub build_server_token: Option<String>,

    /// Build configuration builds are queued for
    pub build_type_id: String,

    /// JSON file holding the trigger definition; re-read every cycle
    pub trigger_config: PathBuf,

    /// Behavior when our action type is not registered
    pub version_policy: VersionPolicy,

    /// Delay between cycles when no override is configured
    pub default_poll_interval: Duration,
}

impl Settings {
    /// Creates settings with defaults
    pub fn new(build_type_id: String, trigger_config: PathBuf) -> Self {
        Self {
            orchestrator_url: None,
            orchestrator_token: None,
            build_server_url: "http://localhost:8111".to_string(),
            build_server_token: None,
            build_type_id,
            trigger_config,
            version_policy: VersionPolicy::default(),
            default_poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    /// Creates settings from environment variables
    ///
    /// Expected environment variables:
    /// - BUILD_TYPE_ID (required)
    /// - TRIGGER_CONFIG (required, path to the trigger definition)
    /// - ORCHESTRATOR_URL (optional, default: regional endpoint)
    /// - ORCHESTRATOR_TOKEN (optional)
    /// - BUILD_SERVER_URL (optional, default: http://localhost:8111)
    /// - BUILD_SERVER_TOKEN (optional)
    /// - ACTION_VERSION_POLICY (optional, `strict` or `fallback:<version>`, default: strict)
    /// - POLL_INTERVAL (optional, seconds, default: 20)
    pub fn from_env() -> anyhow::Result<Self> {
        let build_type_id = std::env::var("BUILD_TYPE_ID")
            .map_err(|_| anyhow::anyhow!("BUILD_TYPE_ID environment variable not set"))?;

        let trigger_config = std::env::var("TRIGGER_CONFIG")
            .map(PathBuf::from)
            .map_err(|_| anyhow::anyhow!("TRIGGER_CONFIG environment variable not set"))?;

        let mut settings = Self::new(build_type_id, trigger_config);
        settings.orchestrator_url = non_empty_var("ORCHESTRATOR_URL");
        settings.orchestrator_token = non_empty_var("ORCHESTRATOR_TOKEN");
        settings.build_server_token = non_empty_var("BUILD_SERVER_TOKEN");

        if let Some(url) = non_empty_var("BUILD_SERVER_URL") {
            settings.build_server_url = url;
        }

        if let Some(policy) = non_empty_var("ACTION_VERSION_POLICY") {
            settings.version_policy = policy
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("Invalid ACTION_VERSION_POLICY")?;
        }

        if let Some(secs) = std::env::var("POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            settings.default_poll_interval = Duration::from_secs(secs);
        }

        Ok(settings)
    }

    /// Validates the settings
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.build_type_id.trim().is_empty() {
            anyhow::bail!("build_type_id cannot be empty");
        }

        if let Some(url) = &self.orchestrator_url {
            if !is_http_url(url) {
                anyhow::bail!("orchestrator_url must start with http:// or https://");
            }
        }

        if !is_http_url(&self.build_server_url) {
            anyhow::bail!("build_server_url must start with http:// or https://");
        }

        if self.default_poll_interval.as_secs() == 0 {
            anyhow::bail!("default_poll_interval must be greater than 0");
        }

        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::new("Deploy_Main".to_string(), PathBuf::from("trigger.json"))
    }

    #[test]
    fn test_default_settings() {
        let settings = settings();
        assert_eq!(settings.default_poll_interval, Duration::from_secs(20));
        assert_eq!(settings.version_policy, VersionPolicy::Strict);
        assert!(settings.orchestrator_url.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = settings();

        settings.build_type_id = String::new();
        assert!(settings.validate().is_err());

        settings.build_type_id = "Deploy_Main".to_string();

        settings.orchestrator_url = Some("localhost:4566".to_string());
        assert!(settings.validate().is_err());

        settings.orchestrator_url = Some("http://localhost:4566".to_string());
        assert!(settings.validate().is_ok());

        settings.build_server_url = "teamcity".to_string();
        assert!(settings.validate().is_err());
    }
}
