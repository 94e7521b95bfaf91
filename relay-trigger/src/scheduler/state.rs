//! Job state machine
//!
//! Drives one polled job through acknowledgment and build dispatch:
//!
//! ```text
//! Polled -> Acknowledged -> Dispatched
//!        \-> Rejected (status other than InProgress)
//! ```
//!
//! Nothing is kept between jobs; the orchestrator owns re-delivery.

use relay_client::PipelineApi;
use relay_core::domain::job::{FailureType, Job, JobStatus};
use relay_core::params::{self, Params};
use relay_core::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::context::TriggerContext;
use crate::service::BuildBackend;

/// Where a job ended up after one pass through the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Acknowledged,
    /// A build was queued for the job
    Dispatched { promotion_id: String },
    /// The orchestrator did not hand the job over; it is dropped
    Rejected { status: JobStatus },
}

pub struct JobStateMachine {
    api: Arc<dyn PipelineApi>,
    backend: Arc<dyn BuildBackend>,
}

impl JobStateMachine {
    pub fn new(api: Arc<dyn PipelineApi>, backend: Arc<dyn BuildBackend>) -> Self {
        Self { api, backend }
    }

    /// Acknowledges the job and queues a build for it
    ///
    /// Any error after the job was received is reported to the orchestrator
    /// as a job failure before being returned.
    pub async fn process(&self, job: &Job, ctx: &TriggerContext) -> Result<JobState> {
        let result = match self.acknowledge(job, ctx).await {
            Ok(JobState::Acknowledged) => self.dispatch(job, ctx).await,
            other => other,
        };

        if let Err(e) = &result {
            error!("{}", ctx.msg(format!("Failed to process job {}: {}", job.id, e)));
            if let Some(details) = e.details() {
                error!("{}", ctx.msg(details));
            }
            self.report_failure(job, &e.to_string(), ctx).await;
        }
        result
    }

    /// Claims the job with its nonce
    ///
    /// Moves to `Acknowledged` only when the orchestrator answers `InProgress`.
    pub async fn acknowledge(&self, job: &Job, ctx: &TriggerContext) -> Result<JobState> {
        let status = self.api.acknowledge_job(&job.id, &job.nonce).await?;

        if status == JobStatus::InProgress {
            Ok(JobState::Acknowledged)
        } else {
            warn!(
                "{}",
                ctx.msg(format!(
                    "Job ignored with ID: {} and nonce: {} because job status is {}",
                    job.id, job.nonce, status
                ))
            );
            Ok(JobState::Rejected { status })
        }
    }

    /// Queues a build carrying the job id and the trigger's parameters
    pub async fn dispatch(&self, job: &Job, ctx: &TriggerContext) -> Result<JobState> {
        let mut customizer = self.backend.create_customizer(&ctx.build_type_id)?;
        customizer.set_parameters(build_parameters(job, ctx));

        let promotion = customizer.create_promotion()?;
        promotion.add_to_queue(&queue_reason(&job.id)).await?;

        info!(
            "{}",
            ctx.msg(format!(
                "Acknowledged job with ID: {} and nonce: {}, created build promotion {}",
                job.id,
                job.nonce,
                promotion.id()
            ))
        );
        Ok(JobState::Dispatched {
            promotion_id: promotion.id().to_string(),
        })
    }

    /// Best effort; a failing report is logged and swallowed
    async fn report_failure(&self, job: &Job, message: &str, ctx: &TriggerContext) {
        if let Err(e) = self
            .api
            .put_job_failure_result(&job.id, None, FailureType::JobFailed, message)
            .await
        {
            error!(
                "{}",
                ctx.msg(format!("Failed to report failure of job {}: {}", job.id, e))
            );
        }
    }
}

/// Trigger parameters plus the job id, with artifact folders defaulted
pub fn build_parameters(job: &Job, ctx: &TriggerContext) -> Params {
    let mut params = ctx.params.clone();
    params.insert(params::JOB_ID_PARAM.to_string(), job.id.clone());
    params
        .entry(params::ARTIFACT_INPUT_FOLDER_PARAM.to_string())
        .or_insert_with(|| params::DEFAULT_ARTIFACT_INPUT_FOLDER.to_string());
    params
        .entry(params::ARTIFACT_OUTPUT_FOLDER_PARAM.to_string())
        .or_insert_with(|| params::DEFAULT_ARTIFACT_OUTPUT_FOLDER.to_string());
    params
}

fn queue_reason(job_id: &str) -> String {
    format!("{} job with ID: {}", params::TRIGGER_DISPLAY_NAME, job_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::RecordingBackend;
    use relay_client::mock::{Operation, RecordingPipelineApi};
    use relay_core::domain::job::JobData;

    fn job(id: &str) -> Job {
        Job {
            id: id.to_string(),
            nonce: format!("{}-nonce", id),
            account_id: None,
            data: JobData::default(),
        }
    }

    fn context() -> TriggerContext {
        let mut params = Params::new();
        params.insert(params::ACTION_TOKEN_PARAM.to_string(), "token-1".to_string());
        params.insert(
            params::ARTIFACT_OUTPUT_FOLDER_PARAM.to_string(),
            "/custom/out".to_string(),
        );
        TriggerContext {
            trigger_id: "t1".to_string(),
            build_type_id: "Deploy_Main".to_string(),
            params,
            build_params: Params::new(),
        }
    }

    fn machine(api: &Arc<RecordingPipelineApi>, backend: &RecordingBackend) -> JobStateMachine {
        JobStateMachine::new(api.clone(), Arc::new(backend.clone()))
    }

    #[tokio::test]
    async fn test_in_progress_is_dispatched() {
        let api = Arc::new(RecordingPipelineApi::new());
        let backend = RecordingBackend::default();

        let state = machine(&api, &backend)
            .process(&job("job-1"), &context())
            .await
            .unwrap();

        assert_eq!(
            state,
            JobState::Dispatched {
                promotion_id: "promotion-1".to_string()
            }
        );
        assert_eq!(
            api.acknowledged(),
            vec![("job-1".to_string(), "job-1-nonce".to_string())]
        );

        let queued = backend.queued();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].build_type_id, "Deploy_Main");
        assert_eq!(queued[0].reason, "AWS CodePipeline Action job with ID: job-1");
    }

    #[tokio::test]
    async fn test_other_status_is_rejected() {
        for status in [JobStatus::Created, JobStatus::Queued, JobStatus::TimedOut, JobStatus::Unknown] {
            let api = Arc::new(RecordingPipelineApi::new());
            api.set_ack_status(status);
            let backend = RecordingBackend::default();

            let state = machine(&api, &backend)
                .process(&job("job-1"), &context())
                .await
                .unwrap();

            assert_eq!(state, JobState::Rejected { status });
            assert!(backend.queued().is_empty());
            assert!(api.failures().is_empty());
        }
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_reported_and_returned() {
        let api = Arc::new(RecordingPipelineApi::new());
        let backend = RecordingBackend::failing();

        let err = machine(&api, &backend)
            .process(&job("job-1"), &context())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Build queue is paused");
        let failures = api.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].job_id, "job-1");
        assert_eq!(failures[0].failure_type, FailureType::JobFailed);
        assert_eq!(failures[0].message, "Build queue is paused");
        assert_eq!(failures[0].execution_id, None);
    }

    #[tokio::test]
    async fn test_failing_report_does_not_mask_error() {
        let api = Arc::new(RecordingPipelineApi::new());
        api.fail(Operation::PutJobFailureResult);
        let backend = RecordingBackend::failing();

        let err = machine(&api, &backend)
            .process(&job("job-1"), &context())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Build queue is paused");
    }

    #[tokio::test]
    async fn test_acknowledge_error_is_reported() {
        let api = Arc::new(RecordingPipelineApi::new());
        api.fail(Operation::AcknowledgeJob);
        let backend = RecordingBackend::default();

        let err = machine(&api, &backend)
            .process(&job("job-1"), &context())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "TRANSPORT_ERROR");
        assert_eq!(api.failures().len(), 1);
        assert!(backend.queued().is_empty());
    }

    #[test]
    fn test_build_parameters() {
        let params = build_parameters(&job("job-9"), &context());

        assert_eq!(params.get(params::JOB_ID_PARAM).unwrap(), "job-9");
        assert_eq!(params.get(params::ACTION_TOKEN_PARAM).unwrap(), "token-1");
        assert_eq!(
            params.get(params::ARTIFACT_INPUT_FOLDER_PARAM).unwrap(),
            params::DEFAULT_ARTIFACT_INPUT_FOLDER
        );
        assert_eq!(
            params.get(params::ARTIFACT_OUTPUT_FOLDER_PARAM).unwrap(),
            "/custom/out"
        );
    }
}
