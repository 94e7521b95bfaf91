//! Job DTOs for the orchestrator API

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::action::ActionTypeId;
use crate::domain::job::{FailureType, Job, JobData, JobStatus};

/// Request for pending jobs of one action type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollForJobsRequest {
    pub action_type_id: ActionTypeId,
    pub query_param: BTreeMap<String, String>,
    pub max_batch_size: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollForJobsResponse {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeJobRequest {
    pub job_id: String,
    pub nonce: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcknowledgeJobResponse {
    pub status: JobStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetJobDetailsRequest {
    pub job_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetJobDetailsResponse {
    pub job_details: JobDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    pub id: String,
    #[serde(default)]
    pub data: JobData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

/// Terminal success report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutJobSuccessResultRequest {
    pub job_id: String,
    pub execution_details: ExecutionDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_execution_id: Option<String>,
    pub summary: String,
}

/// Terminal failure report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutJobFailureResultRequest {
    pub job_id: String,
    pub failure_details: FailureDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureDetails {
    #[serde(rename = "type")]
    pub kind: FailureType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_execution_id: Option<String>,
}
