//! Job result publishing
//!
//! Reports the terminal outcome of a job to the orchestrator. Neither call
//! retries or propagates: an unreported job is eventually timed out by the
//! orchestrator, and a failure report is usually sent from inside another
//! failure path whose cause must not be masked.

use relay_client::PipelineApi;
use relay_core::domain::job::FailureType;
use std::sync::Arc;
use tracing::{error, info};

use crate::build::BuildLog;
use crate::context::JobExecutionContext;

pub const SUCCESS_SUMMARY: &str = "Build successfully finished";

pub struct ResultPublisher {
    api: Arc<dyn PipelineApi>,
}

impl ResultPublisher {
    pub fn new(api: Arc<dyn PipelineApi>) -> Self {
        Self { api }
    }

    /// Reports success with the build id as external execution id
    pub async fn publish_success(&self, job_id: &str, build_id: u64, log: &dyn BuildLog) {
        let execution_id = build_id.to_string();
        match self
            .api
            .put_job_success_result(job_id, Some(&execution_id), SUCCESS_SUMMARY)
            .await
        {
            Ok(()) => info!("Reported success of job {} (build {})", job_id, build_id),
            Err(e) => {
                error!("Failed to report success of job {}: {}", job_id, e);
                log.error(&e.to_string());
            }
        }
    }

    /// Reports failure of the context's job, then clears its job id
    ///
    /// Does nothing when no job id is set. The job id is cleared whatever the
    /// outcome of the call.
    pub async fn publish_failure(
        &self,
        context: &mut JobExecutionContext,
        build_id: u64,
        message: &str,
        log: &dyn BuildLog,
    ) {
        let Some(job_id) = context.clear_job_id() else {
            return;
        };

        let execution_id = build_id.to_string();
        match self
            .api
            .put_job_failure_result(&job_id, Some(&execution_id), FailureType::JobFailed, message)
            .await
        {
            Ok(()) => info!("Reported failure of job {} (build {}): {}", job_id, build_id, message),
            Err(e) => {
                error!("Failed to report failure of job {}: {}", job_id, e);
                log.error(&e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::InMemoryBuildLog;
    use relay_client::mock::{Operation, RecordingPipelineApi};

    #[tokio::test]
    async fn test_publish_success() {
        let api = Arc::new(RecordingPipelineApi::new());
        let log = InMemoryBuildLog::new();

        ResultPublisher::new(api.clone())
            .publish_success("job-1", 42, &log)
            .await;

        let successes = api.successes();
        assert_eq!(successes.len(), 1);
        assert_eq!(successes[0].execution_id.as_deref(), Some("42"));
        assert_eq!(successes[0].summary, "Build successfully finished");
    }

    #[tokio::test]
    async fn test_failing_success_report_is_logged() {
        let api = Arc::new(RecordingPipelineApi::new());
        api.fail(Operation::PutJobSuccessResult);
        let log = InMemoryBuildLog::new();

        ResultPublisher::new(api.clone())
            .publish_success("job-1", 42, &log)
            .await;
        assert_eq!(log.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_clears_job_id() {
        let api = Arc::new(RecordingPipelineApi::new());
        let log = InMemoryBuildLog::new();
        let mut ctx = JobExecutionContext::new();
        ctx.set_job_id("job-1");

        let publisher = ResultPublisher::new(api.clone());
        publisher.publish_failure(&mut ctx, 7, "Build failed", &log).await;
        assert_eq!(ctx.job_id(), None);

        // nothing left to report
        publisher.publish_failure(&mut ctx, 7, "Build failed", &log).await;

        let failures = api.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].job_id, "job-1");
        assert_eq!(failures[0].execution_id.as_deref(), Some("7"));
        assert_eq!(failures[0].message, "Build failed");
    }

    #[tokio::test]
    async fn test_failing_failure_report_still_clears() {
        let api = Arc::new(RecordingPipelineApi::new());
        api.fail(Operation::PutJobFailureResult);
        let log = InMemoryBuildLog::new();
        let mut ctx = JobExecutionContext::new();
        ctx.set_job_id("job-1");

        ResultPublisher::new(api.clone())
            .publish_failure(&mut ctx, 7, "Build failed", &log)
            .await;

        assert_eq!(ctx.job_id(), None);
        assert_eq!(log.entries().len(), 1);
    }
}
