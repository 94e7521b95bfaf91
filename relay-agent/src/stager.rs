//! Artifact staging
//!
//! Moves job artifacts between the object store and the build's working
//! directories. Transfers within one batch run concurrently, but the batch
//! succeeds or fails as a whole: the first error cancels the remaining
//! transfers.

use futures::future::try_join_all;
use relay_client::{EncryptionParams, ObjectStore};
use relay_core::archive::archive_extension;
use relay_core::domain::job::{ArtifactCredentials, ArtifactRef, JobData};
use relay_core::{RelayError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::build::BuildLog;
use crate::resolver::{OutputResolver, OutputScope};

/// Creates object store clients scoped to a job's artifact credentials
pub trait ObjectStoreFactory: Send + Sync {
    fn create(
        &self,
        credentials: Option<&ArtifactCredentials>,
        region: Option<&str>,
    ) -> Result<Arc<dyn ObjectStore>>;
}

/// Hands out the same store for every job
pub struct FixedObjectStore {
    store: Arc<dyn ObjectStore>,
}

impl FixedObjectStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

impl ObjectStoreFactory for FixedObjectStore {
    fn create(
        &self,
        _credentials: Option<&ArtifactCredentials>,
        _region: Option<&str>,
    ) -> Result<Arc<dyn ObjectStore>> {
        Ok(Arc::clone(&self.store))
    }
}

/// Local layout of downloaded input artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputLayout {
    /// `<inputFolder>/<parentDirOfKey><ext>` only
    #[default]
    Flattened,
    /// Flattened file plus a copy at `<inputFolder>/<key>`
    FlattenedWithNestedCopy,
}

pub struct ArtifactStager {
    store: Arc<dyn ObjectStore>,
    layout: InputLayout,
}

impl ArtifactStager {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            layout: InputLayout::default(),
        }
    }

    pub fn with_layout(mut self, layout: InputLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Downloads every input artifact of the job into `input_folder`
    ///
    /// Creates `output_folder` when the job declares output artifacts.
    /// Returns the downloaded files in artifact order.
    pub async fn fetch_inputs(
        &self,
        job: &JobData,
        input_folder: &Path,
        output_folder: &Path,
        log: &dyn BuildLog,
    ) -> Result<Vec<PathBuf>> {
        let downloaded = if job.input_artifacts.is_empty() {
            debug!("No input artifacts provided for the job");
            Vec::new()
        } else {
            let destinations = input_destinations(input_folder, &job.input_artifacts)?;
            create_dir(input_folder).await?;

            let downloads = job.input_artifacts.iter().zip(destinations).map(
                |(artifact, destination)| async move {
                    let location = artifact.storage();
                    log.message(&format!(
                        "Downloading job input artifact {} to {}",
                        location.key,
                        destination.display()
                    ));
                    self.store.download(location, &destination).await?;
                    Ok::<_, RelayError>(destination)
                },
            );
            let downloaded = try_join_all(downloads).await?;

            if self.layout == InputLayout::FlattenedWithNestedCopy {
                for (artifact, file) in job.input_artifacts.iter().zip(&downloaded) {
                    copy_nested(input_folder, artifact, file, log).await;
                }
            }
            downloaded
        };

        if !job.output_artifacts.is_empty() {
            create_dir(output_folder).await?;
        }

        info!("Fetched {} input artifact(s)", downloaded.len());
        Ok(downloaded)
    }

    /// Uploads every output artifact of the job
    ///
    /// All local files are resolved before the first upload starts. Uploads
    /// carry the encryption derived from the job's key descriptor.
    pub async fn publish_outputs(
        &self,
        job: &JobData,
        scope: &OutputScope<'_>,
        resolver: &dyn OutputResolver,
        log: &dyn BuildLog,
    ) -> Result<()> {
        if job.output_artifacts.is_empty() {
            debug!("No output artifacts expected for the job");
            return Ok(());
        }

        let files = resolver.resolve(&job.output_artifacts, scope, log)?;
        let encryption = EncryptionParams::for_key(job.encryption_key.as_ref());

        let uploads = job.output_artifacts.iter().zip(&files).map(|(artifact, file)| {
            let encryption = &encryption;
            async move {
                let location = artifact.storage();
                log.message(&format!(
                    "Uploading job output artifact {} from {}",
                    location.key,
                    file.display()
                ));
                self.store.upload(location, file, encryption).await?;
                Ok::<_, RelayError>(())
            }
        });
        try_join_all(uploads).await?;

        info!("Published {} output artifact(s)", files.len());
        Ok(())
    }
}

/// `<input_folder>/<name of the key's parent directory><archive extension>`
///
/// Keys without a parent directory fall back to the artifact name.
pub fn input_artifact_file(input_folder: &Path, artifact: &ArtifactRef) -> PathBuf {
    let key = &artifact.storage().key;
    let parent = Path::new(key)
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| artifact.name.clone());
    input_folder.join(format!("{}{}", parent, archive_extension(key)))
}

/// Local files for a batch of input artifacts, one distinct path per artifact
///
/// Keys shorten artifact names, so two artifacts can share a parent directory
/// name. Those fall back to `<artifact name><ext>`; a batch that still maps
/// two artifacts to one path is rejected before anything is downloaded.
pub fn input_destinations(input_folder: &Path, artifacts: &[ArtifactRef]) -> Result<Vec<PathBuf>> {
    let preferred: Vec<PathBuf> = artifacts
        .iter()
        .map(|artifact| input_artifact_file(input_folder, artifact))
        .collect();

    let destinations: Vec<PathBuf> = artifacts
        .iter()
        .zip(&preferred)
        .map(|(artifact, path)| {
            if preferred.iter().filter(|p| *p == path).count() > 1 {
                let key = &artifact.storage().key;
                input_folder.join(format!("{}{}", artifact.name, archive_extension(key)))
            } else {
                path.clone()
            }
        })
        .collect();

    let mut seen = HashSet::new();
    for (artifact, path) in artifacts.iter().zip(&destinations) {
        if !seen.insert(path) {
            return Err(RelayError::protocol(format!(
                "Input artifact {} would overwrite another input artifact at {}",
                artifact.name,
                path.display()
            )));
        }
    }
    Ok(destinations)
}

async fn create_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| RelayError::io(format!("Failed to create {}", dir.display()), e))
}

/// Copy failures are logged only
async fn copy_nested(input_folder: &Path, artifact: &ArtifactRef, file: &Path, log: &dyn BuildLog) {
    let dest = input_folder.join(&artifact.storage().key);
    let result = async {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(file, &dest).await
    }
    .await;

    if let Err(e) = result {
        let message = format!("Failed to copy {} to {}: {}", file.display(), dest.display(), e);
        error!("{}", message);
        log.warning(&message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::InMemoryBuildLog;
    use crate::resolver::OutputStrategy;
    use relay_client::mock::MemoryObjectStore;
    use relay_core::domain::job::EncryptionKey;

    fn job(inputs: &[(&str, &str)], outputs: &[(&str, &str)]) -> JobData {
        let refs = |list: &[(&str, &str)]| {
            list.iter()
                .map(|(name, key)| ArtifactRef::new(*name, "bucket", *key))
                .collect::<Vec<_>>()
        };
        JobData {
            input_artifacts: refs(inputs),
            output_artifacts: refs(outputs),
            ..JobData::default()
        }
    }

    fn store_with(job: &JobData) -> Arc<MemoryObjectStore> {
        let store = Arc::new(MemoryObjectStore::new());
        for artifact in &job.input_artifacts {
            store.put_object(artifact.storage().clone(), artifact.name.as_bytes().to_vec());
        }
        store
    }

    fn count_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_input_artifact_file() {
        let folder = Path::new("/in");
        assert_eq!(
            input_artifact_file(folder, &ArtifactRef::new("src", "b", "pipe/MyApp/Ab3x.zip")),
            PathBuf::from("/in/MyApp.zip")
        );
        assert_eq!(
            input_artifact_file(folder, &ArtifactRef::new("src", "b", "pipe/Web/xyz")),
            PathBuf::from("/in/Web")
        );
        assert_eq!(
            input_artifact_file(folder, &ArtifactRef::new("src", "b", "bundle.tar.gz")),
            PathBuf::from("/in/src.tar.gz")
        );
    }

    #[tokio::test]
    async fn test_fetch_creates_exactly_n_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        let output = dir.path().join("output");
        let job = job(
            &[("a", "pipe/A/k1.zip"), ("b", "pipe/B/k2.tgz"), ("c", "pipe/C/k3")],
            &[],
        );
        let store = store_with(&job);
        let log = InMemoryBuildLog::new();

        let files = ArtifactStager::new(store.clone())
            .fetch_inputs(&job, &input, &output, &log)
            .await
            .unwrap();

        assert_eq!(files.len(), 3);
        assert_eq!(count_files(&input), 3);
        assert_eq!(std::fs::read(input.join("B.tgz")).unwrap(), b"b");
        assert!(!output.exists());
        assert_eq!(log.entries().len(), 3);
    }

    #[tokio::test]
    async fn test_shared_key_folder_keeps_every_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        let job = job(
            &[
                ("SourceArtifactA", "pipe/SourceArti/k1.zip"),
                ("SourceArtifactB", "pipe/SourceArti/k2.zip"),
                ("Lib", "pipe/Lib/k3.tgz"),
            ],
            &[],
        );
        let store = store_with(&job);
        let log = InMemoryBuildLog::new();

        let files = ArtifactStager::new(store)
            .fetch_inputs(&job, &input, &dir.path().join("out"), &log)
            .await
            .unwrap();

        assert_eq!(
            files,
            vec![
                input.join("SourceArtifactA.zip"),
                input.join("SourceArtifactB.zip"),
                input.join("Lib.tgz"),
            ]
        );
        assert_eq!(count_files(&input), 3);
        assert_eq!(std::fs::read(input.join("SourceArtifactB.zip")).unwrap(), b"SourceArtifactB");
    }

    #[test]
    fn test_unresolvable_collision_is_rejected() {
        // the renamed "Lib" lands on the file of the artifact stored under Lib/
        let artifacts = vec![
            ArtifactRef::new("Lib", "b", "pipe/Shared/k1.zip"),
            ArtifactRef::new("Other", "b", "pipe/Shared/k2.zip"),
            ArtifactRef::new("Web", "b", "pipe/Lib/k3.zip"),
        ];
        let err = input_destinations(Path::new("/in"), &artifacts).unwrap_err();
        assert_eq!(err.kind(), "PROTOCOL_VIOLATION");
    }

    #[tokio::test]
    async fn test_output_folder_created_iff_outputs_declared() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        let output = dir.path().join("output");
        let job = job(&[], &[("app", "pipe/app/out.zip")]);
        let log = InMemoryBuildLog::new();

        let files = ArtifactStager::new(Arc::new(MemoryObjectStore::new()))
            .fetch_inputs(&job, &input, &output, &log)
            .await
            .unwrap();

        assert!(files.is_empty());
        assert!(!input.exists());
        assert!(output.is_dir());
    }

    #[tokio::test]
    async fn test_failed_download_fails_batch() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(&[("a", "pipe/A/k1.zip"), ("b", "pipe/B/k2.zip")], &[]);
        let store = store_with(&job);
        store.fail_key("pipe/B/k2.zip");
        let log = InMemoryBuildLog::new();

        let err = ArtifactStager::new(store)
            .fetch_inputs(&job, &dir.path().join("in"), &dir.path().join("out"), &log)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "TRANSPORT_ERROR");
        assert!(err.to_string().contains("Access Denied"));
    }

    #[tokio::test]
    async fn test_nested_copy_layout() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input");
        let job = job(&[("a", "pipe/A/k1.zip")], &[]);
        let store = store_with(&job);
        let log = InMemoryBuildLog::new();

        ArtifactStager::new(store)
            .with_layout(InputLayout::FlattenedWithNestedCopy)
            .fetch_inputs(&job, &input, &dir.path().join("out"), &log)
            .await
            .unwrap();

        assert!(input.join("A.zip").is_file());
        assert!(input.join("pipe/A/k1.zip").is_file());
    }

    #[tokio::test]
    async fn test_publish_uses_kms_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.zip"), b"built").unwrap();
        let mut job = job(&[], &[("app", "pipe/app/out.zip")]);
        job.encryption_key = Some(EncryptionKey {
            id: Some("arn:aws:kms:key/1".to_string()),
            kind: Some("KMS".to_string()),
        });
        let store = Arc::new(MemoryObjectStore::new());
        let log = InMemoryBuildLog::new();
        let scope = OutputScope {
            output_folder: dir.path(),
            pipeline_name: "pipe",
            checkout_dir: dir.path(),
        };

        ArtifactStager::new(store.clone())
            .publish_outputs(&job, &scope, &OutputStrategy::Combined, &log)
            .await
            .unwrap();

        let uploads = store.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].location.key, "pipe/app/out.zip");
        assert_eq!(uploads[0].contents, b"built");
        assert_eq!(
            uploads[0].encryption,
            EncryptionParams::Kms {
                key_id: "arn:aws:kms:key/1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unresolved_output_uploads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.zip"), b"built").unwrap();
        let job = job(&[], &[("app", "pipe/app/out.zip"), ("web", "pipe/web/out.zip")]);
        let store = Arc::new(MemoryObjectStore::new());
        let log = InMemoryBuildLog::new();
        let scope = OutputScope {
            output_folder: dir.path(),
            pipeline_name: "pipe",
            checkout_dir: dir.path(),
        };

        let err = ArtifactStager::new(store.clone())
            .publish_outputs(&job, &scope, &OutputStrategy::Combined, &log)
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::MissingArtifact { .. }));
        assert!(store.uploads().is_empty());
    }
}
