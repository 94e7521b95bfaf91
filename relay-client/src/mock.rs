//! In-memory implementations of the capability traits
//!
//! Both types record every call so tests can assert on what the relay sent,
//! and both can be told to fail specific operations.

use async_trait::async_trait;
use relay_core::domain::action::{ActionOwner, ActionType, ActionTypeId};
use relay_core::domain::job::{FailureType, Job, JobData, JobStatus, StorageLocation};
use relay_core::params::Params;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::api::{EncryptionParams, ObjectStore, PipelineApi};
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct PollCall {
    pub action_type_id: ActionTypeId,
    pub query: Params,
    pub max_batch_size: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuccessReport {
    pub job_id: String,
    pub execution_id: Option<String>,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailureReport {
    pub job_id: String,
    pub execution_id: Option<String>,
    pub failure_type: FailureType,
    pub message: String,
}

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    PollForJobs,
    AcknowledgeJob,
    GetJobDetails,
    PutJobSuccessResult,
    PutJobFailureResult,
    ListActionTypes,
}

#[derive(Default)]
struct PipelineState {
    poll_responses: VecDeque<Vec<Job>>,
    ack_status: Option<JobStatus>,
    job_data: HashMap<String, JobData>,
    action_types: Vec<ActionType>,
    failing: HashSet<Operation>,
    polls: Vec<PollCall>,
    acknowledged: Vec<(String, String)>,
    details_requested: Vec<String>,
    successes: Vec<SuccessReport>,
    failures: Vec<FailureReport>,
}

/// Recording orchestrator
///
/// Poll responses are served in the order they were queued; once exhausted
/// every poll returns no jobs. Acknowledgments answer `InProgress` unless told
/// otherwise.
#[derive(Default)]
pub struct RecordingPipelineApi {
    state: Mutex<PipelineState>,
}

impl RecordingPipelineApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_poll_response(&self, jobs: Vec<Job>) {
        self.lock().poll_responses.push_back(jobs);
    }

    pub fn set_ack_status(&self, status: JobStatus) {
        self.lock().ack_status = Some(status);
    }

    pub fn set_job_data(&self, job_id: impl Into<String>, data: JobData) {
        self.lock().job_data.insert(job_id.into(), data);
    }

    pub fn set_action_types(&self, action_types: Vec<ActionType>) {
        self.lock().action_types = action_types;
    }

    pub fn fail(&self, operation: Operation) {
        self.lock().failing.insert(operation);
    }

    pub fn polls(&self) -> Vec<PollCall> {
        self.lock().polls.clone()
    }

    /// `(job_id, nonce)` pairs in acknowledgment order
    pub fn acknowledged(&self) -> Vec<(String, String)> {
        self.lock().acknowledged.clone()
    }

    pub fn details_requested(&self) -> Vec<String> {
        self.lock().details_requested.clone()
    }

    pub fn successes(&self) -> Vec<SuccessReport> {
        self.lock().successes.clone()
    }

    pub fn failures(&self) -> Vec<FailureReport> {
        self.lock().failures.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(state: &PipelineState, operation: Operation) -> Result<()> {
        if state.failing.contains(&operation) {
            return Err(ClientError::api_error(
                500,
                Some("InternalServiceException".to_string()),
                format!("{:?} failed", operation),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PipelineApi for RecordingPipelineApi {
    async fn poll_for_jobs(
        &self,
        action_type_id: &ActionTypeId,
        query: &Params,
        max_batch_size: u32,
    ) -> Result<Vec<Job>> {
        let mut state = self.lock();
        state.polls.push(PollCall {
            action_type_id: action_type_id.clone(),
            query: query.clone(),
            max_batch_size,
        });
        Self::check(&state, Operation::PollForJobs)?;
        Ok(state.poll_responses.pop_front().unwrap_or_default())
    }

    async fn acknowledge_job(&self, job_id: &str, nonce: &str) -> Result<JobStatus> {
        let mut state = self.lock();
        Self::check(&state, Operation::AcknowledgeJob)?;
        state
            .acknowledged
            .push((job_id.to_string(), nonce.to_string()));
        Ok(state.ack_status.unwrap_or(JobStatus::InProgress))
    }

    async fn get_job_details(&self, job_id: &str) -> Result<JobData> {
        let mut state = self.lock();
        state.details_requested.push(job_id.to_string());
        Self::check(&state, Operation::GetJobDetails)?;
        state
            .job_data
            .get(job_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("job {}", job_id)))
    }

    async fn put_job_success_result(
        &self,
        job_id: &str,
        execution_id: Option<&str>,
        summary: &str,
    ) -> Result<()> {
        let mut state = self.lock();
        Self::check(&state, Operation::PutJobSuccessResult)?;
        state.successes.push(SuccessReport {
            job_id: job_id.to_string(),
            execution_id: execution_id.map(str::to_string),
            summary: summary.to_string(),
        });
        Ok(())
    }

    async fn put_job_failure_result(
        &self,
        job_id: &str,
        execution_id: Option<&str>,
        failure_type: FailureType,
        message: &str,
    ) -> Result<()> {
        let mut state = self.lock();
        Self::check(&state, Operation::PutJobFailureResult)?;
        state.failures.push(FailureReport {
            job_id: job_id.to_string(),
            execution_id: execution_id.map(str::to_string),
            failure_type,
            message: message.to_string(),
        });
        Ok(())
    }

    async fn list_action_types(&self, owner: ActionOwner) -> Result<Vec<ActionType>> {
        let state = self.lock();
        Self::check(&state, Operation::ListActionTypes)?;
        Ok(state
            .action_types
            .iter()
            .filter(|t| t.id.owner == owner)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadRecord {
    pub location: StorageLocation,
    pub source: PathBuf,
    pub encryption: EncryptionParams,
    pub contents: Vec<u8>,
}

#[derive(Default)]
struct StoreState {
    objects: HashMap<StorageLocation, Vec<u8>>,
    downloads: Vec<(StorageLocation, PathBuf)>,
    uploads: Vec<UploadRecord>,
    failing_keys: HashSet<String>,
}

/// Object store backed by a map of location to bytes
#[derive(Default)]
pub struct MemoryObjectStore {
    state: Mutex<StoreState>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_object(&self, location: StorageLocation, contents: impl Into<Vec<u8>>) {
        self.lock().objects.insert(location, contents.into());
    }

    /// Any transfer touching this key fails
    pub fn fail_key(&self, key: impl Into<String>) {
        self.lock().failing_keys.insert(key.into());
    }

    pub fn downloads(&self) -> Vec<(StorageLocation, PathBuf)> {
        self.lock().downloads.clone()
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.lock().uploads.clone()
    }

    pub fn object(&self, location: &StorageLocation) -> Option<Vec<u8>> {
        self.lock().objects.get(location).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, location: &StorageLocation) -> Result<()> {
        if self.lock().failing_keys.contains(&location.key) {
            return Err(ClientError::api_error(
                403,
                Some("AccessDenied".to_string()),
                format!("Access Denied for {}", location),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn download(&self, location: &StorageLocation, destination: &Path) -> Result<()> {
        self.check(location)?;
        let contents = self
            .object(location)
            .ok_or_else(|| ClientError::NotFound(location.to_string()))?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, contents).await?;

        self.lock()
            .downloads
            .push((location.clone(), destination.to_path_buf()));
        Ok(())
    }

    async fn upload(
        &self,
        location: &StorageLocation,
        source: &Path,
        encryption: &EncryptionParams,
    ) -> Result<()> {
        self.check(location)?;
        let contents = tokio::fs::read(source).await?;

        let mut state = self.lock();
        state.objects.insert(location.clone(), contents.clone());
        state.uploads.push(UploadRecord {
            location: location.clone(),
            source: source.to_path_buf(),
            encryption: encryption.clone(),
            contents,
        });
        Ok(())
    }
}
