//! Output artifact resolution
//!
//! Finds the local file to upload for each declared output artifact. Three
//! strategies exist and are selected explicitly:
//!
//! - extension probe: `<outputFolder>/<name>.{zip,tar,tar.gz,tgz}`
//! - convention: the single file under `<outputFolder>/<pipeline>/<name>/`
//! - explicit: path specs from the trigger, matched by base name
//!
//! Without explicit specs the combined strategy is used: probe first, then
//! convention. All strategies resolve the whole batch before any upload.

use relay_core::archive::strip_archive_extension;
use relay_core::domain::job::ArtifactRef;
use relay_core::{RelayError, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::build::BuildLog;

/// Suffixes tried by the extension probe, in order
const PROBE_EXTENSIONS: [&str; 4] = [".zip", ".tar", ".tar.gz", ".tgz"];

/// Where outputs of the current job are looked up
#[derive(Debug, Clone, Copy)]
pub struct OutputScope<'a> {
    pub output_folder: &'a Path,
    pub pipeline_name: &'a str,
    /// Base for relative explicit path specs
    pub checkout_dir: &'a Path,
}

pub trait OutputResolver: Send + Sync {
    /// Returns one local file per artifact, in artifact order
    fn resolve(
        &self,
        artifacts: &[ArtifactRef],
        scope: &OutputScope<'_>,
        log: &dyn BuildLog,
    ) -> Result<Vec<PathBuf>>;
}

/// A configured local path for one output artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
    pub path: PathBuf,
    /// File name without its archive extension; matched against artifact names
    pub base_name: String,
}

impl PathSpec {
    pub fn parse(spec: &str) -> Self {
        let path = PathBuf::from(spec.trim());
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            base_name: strip_archive_extension(&file_name).to_string(),
            path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputStrategy {
    ExtensionProbe,
    Convention,
    Explicit(Vec<PathSpec>),
    /// Extension probe, then convention
    Combined,
}

impl OutputStrategy {
    /// Explicit when specs are configured, combined otherwise
    pub fn from_specs(specs: &[String]) -> Self {
        if specs.is_empty() {
            Self::Combined
        } else {
            Self::Explicit(specs.iter().map(|s| PathSpec::parse(s)).collect())
        }
    }
}

impl OutputResolver for OutputStrategy {
    fn resolve(
        &self,
        artifacts: &[ArtifactRef],
        scope: &OutputScope<'_>,
        log: &dyn BuildLog,
    ) -> Result<Vec<PathBuf>> {
        match self {
            OutputStrategy::Explicit(specs) => resolve_explicit(specs, artifacts, scope),
            _ => artifacts
                .iter()
                .map(|artifact| {
                    self.find(artifact, scope, log)
                        .ok_or_else(|| RelayError::MissingArtifact {
                            name: artifact.name.clone(),
                            folder: scope.output_folder.display().to_string(),
                        })
                })
                .collect(),
        }
    }
}

impl OutputStrategy {
    fn find(&self, artifact: &ArtifactRef, scope: &OutputScope<'_>, log: &dyn BuildLog) -> Option<PathBuf> {
        match self {
            OutputStrategy::ExtensionProbe => probe(&artifact.name, scope.output_folder),
            OutputStrategy::Convention => by_convention(&artifact.name, scope, log),
            OutputStrategy::Combined => probe(&artifact.name, scope.output_folder)
                .or_else(|| by_convention(&artifact.name, scope, log)),
            OutputStrategy::Explicit(_) => None,
        }
    }
}

fn probe(name: &str, output_folder: &Path) -> Option<PathBuf> {
    PROBE_EXTENSIONS
        .iter()
        .map(|ext| output_folder.join(format!("{}{}", name, ext)))
        .find(|path| path.is_file())
}

fn by_convention(name: &str, scope: &OutputScope<'_>, log: &dyn BuildLog) -> Option<PathBuf> {
    let dir = scope.output_folder.join(scope.pipeline_name).join(name);
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    if files.len() > 1 {
        let message = format!(
            "Multiple output artifacts detected in {}. Will publish only one of them",
            dir.display()
        );
        warn!("{}", message);
        log.warning(&message);
    }
    files.into_iter().next()
}

fn resolve_explicit(
    specs: &[PathSpec],
    artifacts: &[ArtifactRef],
    scope: &OutputScope<'_>,
) -> Result<Vec<PathBuf>> {
    if specs.len() != artifacts.len() {
        return Err(RelayError::protocol(format!(
            "{} output artifact paths specified, but the job declares {} output artifacts",
            specs.len(),
            artifacts.len()
        )));
    }

    artifacts
        .iter()
        .map(|artifact| {
            let spec = specs
                .iter()
                .find(|spec| spec.base_name == artifact.name)
                .ok_or_else(|| {
                    RelayError::protocol(format!(
                        "No matching artifact path specified for output artifact {}",
                        artifact.name
                    ))
                })?;

            let path = scope.checkout_dir.join(&spec.path);
            if !path.is_file() {
                return Err(RelayError::MissingArtifact {
                    name: artifact.name.clone(),
                    folder: path
                        .parent()
                        .unwrap_or(scope.checkout_dir)
                        .display()
                        .to_string(),
                });
            }
            Ok(path)
        })
        .collect()
}
