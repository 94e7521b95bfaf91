//! Job poller
//!
//! Polls the orchestrator for jobs of our custom action and feeds at most one
//! job per cycle into the job state machine. Cycles run one after another; the
//! delay between them is re-read from configuration every time.

use anyhow::Result as AnyResult;
use relay_client::PipelineApi;
use relay_core::domain::action::ActionTypeId;
use relay_core::domain::trigger::{TriggerConfig, parse_poll_interval};
use relay_core::params::{self, Params};
use relay_core::Result;
use std::sync::Arc;
use tokio::time::{self, Duration};
use tracing::{debug, error, info, warn};

use crate::context::TriggerContext;
use crate::scheduler::state::{JobState, JobStateMachine};
use crate::service::{BuildBackend, VersionResolver};

/// Jobs requested per poll; the trigger handles one job per cycle
const MAX_BATCH_SIZE: u32 = 1;

/// Job poller that continuously polls for and dispatches jobs
pub struct JobPoller {
    api: Arc<dyn PipelineApi>,
    machine: JobStateMachine,
    versions: VersionResolver,
    default_interval: Duration,
}

impl JobPoller {
    /// Creates a new job poller
    pub fn new(
        api: Arc<dyn PipelineApi>,
        backend: Arc<dyn BuildBackend>,
        versions: VersionResolver,
    ) -> Self {
        Self {
            machine: JobStateMachine::new(Arc::clone(&api), backend),
            api,
            versions,
            default_interval: Duration::from_secs(params::DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    pub fn with_default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }

    /// Starts the polling loop
    ///
    /// `load` is called at the start of every cycle so edits to the trigger
    /// definition are picked up without a restart.
    pub async fn run<F>(&self, load: F) -> AnyResult<()>
    where
        F: Fn() -> AnyResult<TriggerContext>,
    {
        info!(
            "Starting job poller (default interval: {:?}, version policy: {})",
            self.default_interval,
            self.versions.policy()
        );

        loop {
            let interval = match load() {
                Ok(ctx) => {
                    debug!("{}", ctx.msg(format!("Polling for jobs (trigger {})", ctx.trigger_id)));
                    match self.poll_once(&ctx).await {
                        Ok(Some(state)) => {
                            info!("{}", ctx.msg(format!("Poll cycle ended with {:?}", state)))
                        }
                        Ok(None) => {}
                        Err(e) => error!("{}", ctx.msg(format!("Error during poll cycle: {}", e))),
                    }
                    self.poll_interval(&ctx)
                }
                Err(e) => {
                    error!("Failed to load trigger definition: {:#}", e);
                    self.default_interval
                }
            };

            time::sleep(interval).await;
        }
    }

    /// Performs a single poll cycle
    ///
    /// Trigger parameters are validated before any network call. Returns the
    /// state of the job handled in this cycle, or `None` when there was none.
    pub async fn poll_once(&self, ctx: &TriggerContext) -> Result<Option<JobState>> {
        let config = TriggerConfig::from_params(&ctx.params)?;

        let version = self.versions.resolve(self.api.as_ref()).await?;
        let action_type_id = ActionTypeId::custom_build(version);

        let mut query = Params::new();
        query.insert(
            params::ACTION_TOKEN_QUERY_PARAM.to_string(),
            config.action_token.clone(),
        );

        let jobs = self
            .api
            .poll_for_jobs(&action_type_id, &query, MAX_BATCH_SIZE)
            .await?;

        let Some(job) = jobs.first() else {
            debug!("{}", ctx.msg("No jobs found"));
            return Ok(None);
        };

        if jobs.len() > 1 {
            warn!(
                "{}",
                ctx.msg(format!(
                    "Received {} jobs, but only one was expected. Will process only the first job",
                    jobs.len()
                ))
            );
        }

        info!(
            "{}",
            ctx.msg(format!(
                "Received job request with ID: {} and nonce: {}",
                job.id, job.nonce
            ))
        );

        self.machine.process(job, ctx).await.map(Some)
    }

    /// Delay before the next cycle
    ///
    /// The build configuration's override wins over the trigger's own. Only
    /// the winning value is looked at: when it is not a positive whole number
    /// of seconds, the default interval applies and a warning is logged.
    pub fn poll_interval(&self, ctx: &TriggerContext) -> Duration {
        let Some(value) = [&ctx.build_params, &ctx.params]
            .into_iter()
            .find_map(|source| source.get(params::POLL_INTERVAL_PARAM))
        else {
            return self.default_interval;
        };

        parse_poll_interval(value).unwrap_or_else(|| {
            warn!(
                "{}",
                ctx.msg(format!(
                    "Unexpected custom poll interval value provided by {} configuration parameter: {}",
                    params::POLL_INTERVAL_PARAM, value
                ))
            );
            self.default_interval
        })
    }
}
