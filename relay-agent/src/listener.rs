//! Build lifecycle listener
//!
//! Hooks the job lifecycle into the build: inputs are fetched once sources
//! are ready, outputs are published and the result reported right before the
//! build finishes. Any error inside a phase becomes a build problem and, when
//! a job is known, a failure report to the orchestrator.

use relay_client::PipelineApi;
use relay_core::domain::job::JobData;
use relay_core::domain::problem::{BuildProblem, sanitize_message};
use relay_core::params::{self, Params};
use relay_core::{RelayError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

use crate::build::{AgentBuild, BuildFinishedStatus};
use crate::context::JobExecutionContext;
use crate::publisher::ResultPublisher;
use crate::resolver::{OutputScope, OutputStrategy};
use crate::stager::{ArtifactStager, InputLayout, ObjectStoreFactory};

pub struct BuildListener {
    api: Arc<dyn PipelineApi>,
    stores: Arc<dyn ObjectStoreFactory>,
    publisher: ResultPublisher,
    layout: InputLayout,
    context: JobExecutionContext,
}

impl BuildListener {
    pub fn new(api: Arc<dyn PipelineApi>, stores: Arc<dyn ObjectStoreFactory>) -> Self {
        Self {
            publisher: ResultPublisher::new(Arc::clone(&api)),
            api,
            stores,
            layout: InputLayout::default(),
            context: JobExecutionContext::new(),
        }
    }

    pub fn with_input_layout(mut self, layout: InputLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn context(&self) -> &JobExecutionContext {
        &self.context
    }

    // =============================================================================
    // Lifecycle hooks
    // =============================================================================

    /// Must be the first hook of every build
    pub fn on_build_started(&mut self, _build: &dyn AgentBuild) {
        self.context.reset();
    }

    pub async fn on_sources_ready(&mut self, build: &dyn AgentBuild) {
        self.process_job_input(build).await;
    }

    pub async fn on_before_runner_start(&mut self, build: &dyn AgentBuild) {
        self.process_job_input(build).await;
    }

    pub async fn on_before_build_finish(&mut self, build: &dyn AgentBuild, status: BuildFinishedStatus) {
        self.process_job_output(build, status).await;
    }

    // =============================================================================
    // Phases
    // =============================================================================

    async fn process_job_input(&mut self, build: &dyn AgentBuild) {
        if !self.context.begin_inputs() {
            return;
        }

        let Some(job_id) = params::job_id(build.shared_config_parameters()) else {
            debug!("Build {}: no pipeline job found for the build", build.build_id());
            return;
        };
        let job_id = job_id.to_string();
        self.context.set_job_id(job_id.clone());

        if let Err(e) = self.fetch_job_input(build, &job_id).await {
            self.fail_on_error(build, &e).await;
        }
    }

    async fn fetch_job_input(&self, build: &dyn AgentBuild, job_id: &str) -> Result<()> {
        let params = build.shared_config_parameters();
        let job = self.api.get_job_details(job_id).await?;

        if let Some(banner) = pipeline_banner(&job, params, job_id) {
            build.build_log().message(&banner);
        }

        let input_folder = artifact_folder(
            build,
            params::ARTIFACT_INPUT_FOLDER_PARAM,
            params::DEFAULT_ARTIFACT_INPUT_FOLDER,
        );
        let output_folder = artifact_folder(
            build,
            params::ARTIFACT_OUTPUT_FOLDER_PARAM,
            params::DEFAULT_ARTIFACT_OUTPUT_FOLDER,
        );

        self.stager(&job, params)?
            .fetch_inputs(&job, &input_folder, &output_folder, build.build_log())
            .await?;
        Ok(())
    }

    async fn process_job_output(&mut self, build: &dyn AgentBuild, status: BuildFinishedStatus) {
        let Some(job_id) = self.context.job_id().map(str::to_string) else {
            return;
        };
        let log = build.build_log();

        if build.is_failing_on_server() || status == BuildFinishedStatus::Failed {
            self.publisher
                .publish_failure(&mut self.context, build.build_id(), "Build failed", log)
                .await;
            return;
        }
        if status == BuildFinishedStatus::Interrupted {
            self.publisher
                .publish_failure(&mut self.context, build.build_id(), "Build interrupted", log)
                .await;
            return;
        }

        match self.publish_job_output(build, &job_id).await {
            Ok(()) => {
                self.context.mark_outputs_published();
                self.publisher
                    .publish_success(&job_id, build.build_id(), log)
                    .await;
                self.context.clear_job_id();
            }
            Err(e) => self.fail_on_error(build, &e).await,
        }
    }

    async fn publish_job_output(&self, build: &dyn AgentBuild, job_id: &str) -> Result<()> {
        let params = build.shared_config_parameters();
        let job = self.api.get_job_details(job_id).await?;

        let output_folder = artifact_folder(
            build,
            params::ARTIFACT_OUTPUT_FOLDER_PARAM,
            params::DEFAULT_ARTIFACT_OUTPUT_FOLDER,
        );
        let scope = OutputScope {
            output_folder: &output_folder,
            pipeline_name: job
                .pipeline_context
                .as_ref()
                .map(|c| c.pipeline_name.as_str())
                .unwrap_or_default(),
            checkout_dir: build.checkout_dir(),
        };
        let strategy = OutputStrategy::from_specs(&params::output_path_specs(params));

        self.stager(&job, params)?
            .publish_outputs(&job, &scope, &strategy, build.build_log())
            .await
    }

    /// Surfaces the error on the build and mirrors it to the orchestrator
    async fn fail_on_error(&mut self, build: &dyn AgentBuild, err: &RelayError) {
        let log = build.build_log();
        let scratch = scratch_dirs(build);
        let scratch: Vec<&Path> = scratch.iter().map(PathBuf::as_path).collect();
        let problem = BuildProblem::from_error(
            build.checkout_dir(),
            &scratch,
            build.shared_config_parameters(),
            err,
        );

        error!("Build {}: {}", build.build_id(), err);
        log.error(&problem.description);

        if let Some(details) = err.details() {
            error!("Build {}: {}", build.build_id(), details);
            let mut roots = vec![build.checkout_dir()];
            roots.extend_from_slice(&scratch);
            log.error(&sanitize_message(details, &roots));
        }

        let message = problem.description.clone();
        log.problem(problem);

        self.publisher
            .publish_failure(&mut self.context, build.build_id(), &message, log)
            .await;
    }

    fn stager(&self, job: &JobData, params: &Params) -> Result<ArtifactStager> {
        let store = self
            .stores
            .create(job.artifact_credentials.as_ref(), params::region(params))?;
        Ok(ArtifactStager::new(store).with_layout(self.layout))
    }
}

/// Folder parameter of the build, defaulted and resolved against the build's temp dir
fn artifact_folder(build: &dyn AgentBuild, param: &str, default: &str) -> PathBuf {
    let value = build
        .shared_config_parameters()
        .get(param)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default);
    PathBuf::from(value.replace(
        params::BUILD_TEMP_DIR_REF,
        &build.temp_dir().to_string_lossy(),
    ))
}

/// Host directories to strip from messages besides the checkout dir
///
/// The temp dir holds the default artifact folders. A configured folder
/// outside both contributes its parent, so the folder name itself survives.
fn scratch_dirs(build: &dyn AgentBuild) -> Vec<PathBuf> {
    let mut dirs = vec![build.temp_dir().to_path_buf()];
    for (param, default) in [
        (params::ARTIFACT_INPUT_FOLDER_PARAM, params::DEFAULT_ARTIFACT_INPUT_FOLDER),
        (params::ARTIFACT_OUTPUT_FOLDER_PARAM, params::DEFAULT_ARTIFACT_OUTPUT_FOLDER),
    ] {
        let folder = artifact_folder(build, param, default);
        if folder.starts_with(build.temp_dir()) || folder.starts_with(build.checkout_dir()) {
            continue;
        }
        if let Some(parent) = folder.parent().filter(|p| p.parent().is_some()) {
            dirs.push(parent.to_path_buf());
        }
    }
    dirs
}

fn pipeline_banner(job: &JobData, params: &Params, job_id: &str) -> Option<String> {
    let ctx = job.pipeline_context.as_ref()?;
    Some(format!(
        "This build is a part of an AWS CodePipeline pipeline: {name}\n\
         Link: https://console.aws.amazon.com/codepipeline/home?region={region}#/view/{name}\n\
         Stage: {stage}\n\
         Action: {action}\n\
         Job ID: {job_id}",
        name = ctx.pipeline_name,
        region = params::region(params).unwrap_or_default(),
        stage = ctx.stage.name,
        action = ctx.action.name,
        job_id = job_id,
    ))
}
