//! Relay Trigger
//!
//! Polls the pipeline orchestrator for jobs of the custom build action and
//! queues a build on the build server for each acknowledged job.
//!
//! Architecture:
//! - Configuration: Process settings from the environment
//! - Services: Build queue backend and action type version lookup
//! - Scheduler: Poll loop and the per-job state machine
//!
//! The trigger definition file is re-read every cycle, so the action token,
//! credentials and poll interval can change without a restart.

mod config;
mod context;
mod scheduler;
mod service;

use anyhow::{Context, Result};
use relay_client::{HttpPipelineClient, PipelineApi};
use relay_core::domain::trigger::TriggerDefinition;
use relay_core::params;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Settings;
use crate::context::TriggerContext;
use crate::scheduler::JobPoller;
use crate::service::{BuildBackend, HttpBuildQueue, VersionResolver};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_trigger=info,relay_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Relay Trigger");

    // Load configuration
    let settings = Settings::from_env().context("Failed to load settings")?;
    settings.validate()?;

    let definition = TriggerDefinition::load(&settings.trigger_config)
        .with_context(|| format!("Failed to load {}", settings.trigger_config.display()))?;
    info!(
        "Loaded configuration: build_type_id={}, trigger={}",
        settings.build_type_id,
        params::describe_trigger(&definition.parameters)
    );

    // Initialize orchestrator client
    let api: Arc<dyn PipelineApi> = Arc::new(orchestrator_client(&settings, &definition)?);
    info!("Orchestrator client initialized");

    let mut queue = HttpBuildQueue::new(settings.build_server_url.clone());
    if let Some(token) = &settings.build_server_token {
        queue = queue.with_token(token.clone());
    }
    let backend: Arc<dyn BuildBackend> = Arc::new(queue);

    let poller = JobPoller::new(
        api,
        backend,
        VersionResolver::new(settings.version_policy.clone()),
    )
    .with_default_interval(settings.default_poll_interval);

    // Start polling loop
    info!("Starting job polling loop");
    let load = || -> Result<TriggerContext> {
        let definition = TriggerDefinition::load(&settings.trigger_config)?;
        Ok(TriggerContext::new(settings.build_type_id.clone(), definition))
    };
    if let Err(e) = poller.run(load).await {
        error!("Poller error: {}", e);
        return Err(e);
    }

    Ok(())
}

/// Builds the orchestrator client from settings, or from the trigger's region
fn orchestrator_client(
    settings: &Settings,
    definition: &TriggerDefinition,
) -> Result<HttpPipelineClient> {
    let client = match &settings.orchestrator_url {
        Some(url) => HttpPipelineClient::new(url.clone()),
        None => {
            let region = params::region(&definition.parameters)
                .context("ORCHESTRATOR_URL is not set and the trigger has no region")?;
            HttpPipelineClient::for_region(region)
        }
    };

    Ok(match &settings.orchestrator_token {
        Some(token) => client.with_token(token.clone()),
        None => client,
    })
}
