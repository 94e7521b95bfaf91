//! Job-related API operations

use relay_core::domain::action::ActionTypeId;
use relay_core::domain::job::{FailureType, Job, JobData, JobStatus};
use relay_core::dto::job::{
    AcknowledgeJobRequest, AcknowledgeJobResponse, ExecutionDetails, FailureDetails,
    GetJobDetailsRequest, GetJobDetailsResponse, PollForJobsRequest, PollForJobsResponse,
    PutJobFailureResultRequest, PutJobSuccessResultRequest,
};
use relay_core::params::Params;

use crate::HttpPipelineClient;
use crate::error::Result;

impl HttpPipelineClient {
    // =============================================================================
    // Job Lifecycle
    // =============================================================================

    /// Poll for pending jobs of an action type
    ///
    /// # Arguments
    /// * `action_type_id` - The action identity to poll for
    /// * `query` - Query parameters the job's action configuration must match
    /// * `max_batch_size` - Maximum number of jobs to return
    pub async fn poll_for_jobs(
        &self,
        action_type_id: &ActionTypeId,
        query: &Params,
        max_batch_size: u32,
    ) -> Result<Vec<Job>> {
        let request = PollForJobsRequest {
            action_type_id: action_type_id.clone(),
            query_param: query.clone(),
            max_batch_size,
        };
        let response: PollForJobsResponse = self.call("PollForJobs", &request).await?;

        Ok(response.jobs)
    }

    /// Acknowledge a polled job
    ///
    /// # Returns
    /// The status the orchestrator moved the job to
    pub async fn acknowledge_job(&self, job_id: &str, nonce: &str) -> Result<JobStatus> {
        let request = AcknowledgeJobRequest {
            job_id: job_id.to_string(),
            nonce: nonce.to_string(),
        };
        let response: AcknowledgeJobResponse = self.call("AcknowledgeJob", &request).await?;

        Ok(response.status)
    }

    /// Get the full data of a job
    pub async fn get_job_details(&self, job_id: &str) -> Result<JobData> {
        let request = GetJobDetailsRequest {
            job_id: job_id.to_string(),
        };
        let response: GetJobDetailsResponse = self.call("GetJobDetails", &request).await?;

        Ok(response.job_details.data)
    }

    /// Report a job as successfully finished
    ///
    /// # Arguments
    /// * `job_id` - The job to complete
    /// * `execution_id` - External execution id (the build id)
    /// * `summary` - Short human readable summary
    pub async fn put_job_success_result(
        &self,
        job_id: &str,
        execution_id: Option<&str>,
        summary: &str,
    ) -> Result<()> {
        let request = PutJobSuccessResultRequest {
            job_id: job_id.to_string(),
            execution_details: ExecutionDetails {
                external_execution_id: execution_id.map(str::to_string),
                summary: summary.to_string(),
            },
        };

        self.call_empty("PutJobSuccessResult", &request).await
    }

    /// Report a job as failed
    pub async fn put_job_failure_result(
        &self,
        job_id: &str,
        execution_id: Option<&str>,
        failure_type: FailureType,
        message: &str,
    ) -> Result<()> {
        let request = PutJobFailureResultRequest {
            job_id: job_id.to_string(),
            failure_details: FailureDetails {
                kind: failure_type,
                message: message.to_string(),
                external_execution_id: execution_id.map(str::to_string),
            },
        };

        self.call_empty("PutJobFailureResult", &request).await
    }
}
