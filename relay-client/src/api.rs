//! Capability interfaces
//!
//! The relay never talks to the orchestrator or the object store directly;
//! it goes through these traits so the transport can be swapped and tested.

use async_trait::async_trait;
use relay_core::domain::action::{ActionOwner, ActionType, ActionTypeId};
use relay_core::domain::job::{EncryptionKey, FailureType, Job, JobData, JobStatus, StorageLocation};
use relay_core::params::Params;
use std::path::Path;

use crate::error::Result;

/// Operations the relay needs from the pipeline orchestrator
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Fetches up to `max_batch_size` pending jobs for the action type
    async fn poll_for_jobs(
        &self,
        action_type_id: &ActionTypeId,
        query: &Params,
        max_batch_size: u32,
    ) -> Result<Vec<Job>>;

    /// Claims a polled job; returns the status the orchestrator moved it to
    async fn acknowledge_job(&self, job_id: &str, nonce: &str) -> Result<JobStatus>;

    async fn get_job_details(&self, job_id: &str) -> Result<JobData>;

    async fn put_job_success_result(
        &self,
        job_id: &str,
        execution_id: Option<&str>,
        summary: &str,
    ) -> Result<()>;

    async fn put_job_failure_result(
        &self,
        job_id: &str,
        execution_id: Option<&str>,
        failure_type: FailureType,
        message: &str,
    ) -> Result<()>;

    /// Lists registered action types of one owner, in listing order
    async fn list_action_types(&self, owner: ActionOwner) -> Result<Vec<ActionType>>;
}

/// Server-side encryption requested for an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptionParams {
    /// Default account-managed key
    AccountManaged,
    /// Explicit key-management key id
    Kms { key_id: String },
}

impl EncryptionParams {
    /// Derives the upload encryption from the job's key descriptor
    ///
    /// Anything but a complete descriptor of the supported key-management type
    /// falls back to the account-managed key.
    pub fn for_key(key: Option<&EncryptionKey>) -> Self {
        match key {
            Some(EncryptionKey {
                id: Some(id),
                kind: Some(kind),
            }) if kind == EncryptionKey::KMS && !id.is_empty() => Self::Kms {
                key_id: id.clone(),
            },
            _ => Self::AccountManaged,
        }
    }
}

/// Operations the relay needs from the artifact object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn download(&self, location: &StorageLocation, destination: &Path) -> Result<()>;

    async fn upload(
        &self,
        location: &StorageLocation,
        source: &Path,
        encryption: &EncryptionParams,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: Option<&str>, kind: Option<&str>) -> EncryptionKey {
        EncryptionKey {
            id: id.map(str::to_string),
            kind: kind.map(str::to_string),
        }
    }

    #[test]
    fn test_kms_key_is_used() {
        let k = key(Some("arn:aws:kms:key/1"), Some("KMS"));
        assert_eq!(
            EncryptionParams::for_key(Some(&k)),
            EncryptionParams::Kms {
                key_id: "arn:aws:kms:key/1".to_string()
            }
        );
    }

    #[test]
    fn test_incomplete_or_foreign_key_falls_back() {
        assert_eq!(EncryptionParams::for_key(None), EncryptionParams::AccountManaged);
        assert_eq!(
            EncryptionParams::for_key(Some(&key(None, Some("KMS")))),
            EncryptionParams::AccountManaged
        );
        assert_eq!(
            EncryptionParams::for_key(Some(&key(Some("id"), None))),
            EncryptionParams::AccountManaged
        );
        assert_eq!(
            EncryptionParams::for_key(Some(&key(Some("id"), Some("PGP")))),
            EncryptionParams::AccountManaged
        );
    }
}
