//! Job domain types
//!
//! A job is handed out by the orchestrator in a poll response. It is immutable
//! once received and is claimed exactly once by acknowledging it with its nonce.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::action::ActionTypeId;

/// A unit of work assigned by the orchestrator to this action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    /// One-time token proving the acknowledgment matches this poll response
    pub nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub data: JobData,
}

impl Job {
    pub fn input_artifacts(&self) -> &[ArtifactRef] {
        &self.data.input_artifacts
    }

    pub fn output_artifacts(&self) -> &[ArtifactRef] {
        &self.data.output_artifacts
    }

    pub fn encryption_key(&self) -> Option<&EncryptionKey> {
        self.data.encryption_key.as_ref()
    }
}

/// Job payload as returned by both the poll and the job details calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type_id: Option<ActionTypeId>,
    #[serde(default)]
    pub action_configuration: ActionConfiguration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_context: Option<PipelineContext>,
    #[serde(default)]
    pub input_artifacts: Vec<ArtifactRef>,
    #[serde(default)]
    pub output_artifacts: Vec<ArtifactRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_credentials: Option<ArtifactCredentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<EncryptionKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionConfiguration {
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
}

/// Where in the pipeline the job was issued from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineContext {
    pub pipeline_name: String,
    #[serde(default)]
    pub stage: NamedContext,
    #[serde(default)]
    pub action: NamedContext,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedContext {
    #[serde(default)]
    pub name: String,
}

/// Maps a logical artifact name to a physical object-store location
///
/// Names are unique within the input list and within the output list of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub location: ArtifactLocation,
}

impl ArtifactRef {
    pub fn new(name: impl Into<String>, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            revision: None,
            location: ArtifactLocation {
                kind: ArtifactLocation::S3.to_string(),
                s3_location: StorageLocation {
                    bucket: bucket.into(),
                    key: key.into(),
                },
            },
        }
    }

    pub fn storage(&self) -> &StorageLocation {
        &self.location.s3_location
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactLocation {
    #[serde(rename = "type")]
    pub kind: String,
    pub s3_location: StorageLocation,
}

impl ArtifactLocation {
    pub const S3: &'static str = "S3";
}

/// Physical object-store address: container (bucket) plus object key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageLocation {
    #[serde(rename = "bucketName")]
    pub bucket: String,
    #[serde(rename = "objectKey")]
    pub key: String,
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Short-lived credentials scoped to the job's artifact bucket
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl fmt::Debug for ArtifactCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &"***")
            .finish()
    }
}

/// Key descriptor used for server-side encryption of uploaded artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptionKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl EncryptionKey {
    /// The only key-management type that maps to an explicit key id
    pub const KMS: &'static str = "KMS";
}

/// Status returned by the orchestrator when a job is acknowledged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Created,
    Queued,
    Dispatched,
    InProgress,
    TimedOut,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Created => write!(f, "Created"),
            JobStatus::Queued => write!(f, "Queued"),
            JobStatus::Dispatched => write!(f, "Dispatched"),
            JobStatus::InProgress => write!(f, "InProgress"),
            JobStatus::TimedOut => write!(f, "TimedOut"),
            JobStatus::Succeeded => write!(f, "Succeeded"),
            JobStatus::Failed => write!(f, "Failed"),
            JobStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Failure category reported back to the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureType {
    JobFailed,
    ConfigurationError,
    PermissionError,
    RevisionOutOfSync,
    RevisionUnavailable,
    SystemUnavailable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_deserializes_wire_shape() {
        let json = serde_json::json!({
            "id": "job-1",
            "nonce": "n-1",
            "accountId": "123456789012",
            "data": {
                "pipelineContext": {
                    "pipelineName": "MyPipeline",
                    "stage": { "name": "Build" },
                    "action": { "name": "TeamCity" }
                },
                "inputArtifacts": [{
                    "name": "src",
                    "location": {
                        "type": "S3",
                        "s3Location": { "bucketName": "bucket", "objectKey": "MyPipeline/src/abc.zip" }
                    }
                }],
                "outputArtifacts": [],
                "encryptionKey": { "id": "arn:kms:key", "type": "KMS" }
            }
        });

        let job: Job = serde_json::from_value(json).unwrap();
        assert_eq!(job.id, "job-1");
        assert_eq!(job.nonce, "n-1");
        assert_eq!(job.input_artifacts().len(), 1);
        assert_eq!(job.input_artifacts()[0].storage().key, "MyPipeline/src/abc.zip");
        assert!(job.output_artifacts().is_empty());
        assert_eq!(
            job.data.pipeline_context.as_ref().unwrap().pipeline_name,
            "MyPipeline"
        );
        assert_eq!(
            job.encryption_key().unwrap().kind.as_deref(),
            Some(EncryptionKey::KMS)
        );
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let status: JobStatus = serde_json::from_str("\"Paused\"").unwrap();
        assert_eq!(status, JobStatus::Unknown);

        let status: JobStatus = serde_json::from_str("\"InProgress\"").unwrap();
        assert_eq!(status, JobStatus::InProgress);
    }

    #[test]
    fn test_artifact_credentials_debug_hides_secrets() {
        let creds = ArtifactCredentials {
            access_key_id: "AKIA".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: "token".to_string(),
        };
        let printed = format!("{:?}", creds);
        assert!(printed.contains("AKIA"));
        assert!(!printed.contains("secret\""));
        assert!(!printed.contains("token\""));
    }
}
