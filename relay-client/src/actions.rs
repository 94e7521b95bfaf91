//! Action type API operations

use async_trait::async_trait;
use relay_core::domain::action::{ActionOwner, ActionType, ActionTypeId};
use relay_core::domain::job::{FailureType, Job, JobData, JobStatus};
use relay_core::dto::action::{ListActionTypesRequest, ListActionTypesResponse};
use relay_core::params::Params;

use crate::HttpPipelineClient;
use crate::api::PipelineApi;
use crate::error::Result;

impl HttpPipelineClient {
    /// List registered action types of one owner
    ///
    /// Follows continuation tokens until the listing is exhausted, keeping the
    /// orchestrator's listing order.
    pub async fn list_action_types(&self, owner: ActionOwner) -> Result<Vec<ActionType>> {
        let mut action_types = Vec::new();
        let mut next_token = None;

        loop {
            let request = ListActionTypesRequest {
                action_owner_filter: Some(owner),
                next_token: next_token.take(),
            };
            let page: ListActionTypesResponse = self.call("ListActionTypes", &request).await?;
            action_types.extend(page.action_types);

            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(action_types)
    }
}

#[async_trait]
impl PipelineApi for HttpPipelineClient {
    async fn poll_for_jobs(
        &self,
        action_type_id: &ActionTypeId,
        query: &Params,
        max_batch_size: u32,
    ) -> Result<Vec<Job>> {
        HttpPipelineClient::poll_for_jobs(self, action_type_id, query, max_batch_size).await
    }

    async fn acknowledge_job(&self, job_id: &str, nonce: &str) -> Result<JobStatus> {
        HttpPipelineClient::acknowledge_job(self, job_id, nonce).await
    }

    async fn get_job_details(&self, job_id: &str) -> Result<JobData> {
        HttpPipelineClient::get_job_details(self, job_id).await
    }

    async fn put_job_success_result(
        &self,
        job_id: &str,
        execution_id: Option<&str>,
        summary: &str,
    ) -> Result<()> {
        HttpPipelineClient::put_job_success_result(self, job_id, execution_id, summary).await
    }

    async fn put_job_failure_result(
        &self,
        job_id: &str,
        execution_id: Option<&str>,
        failure_type: FailureType,
        message: &str,
    ) -> Result<()> {
        HttpPipelineClient::put_job_failure_result(self, job_id, execution_id, failure_type, message)
            .await
    }

    async fn list_action_types(&self, owner: ActionOwner) -> Result<Vec<ActionType>> {
        HttpPipelineClient::list_action_types(self, owner).await
    }
}
