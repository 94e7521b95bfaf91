//! Job command handlers
//!
//! Inspects pipeline jobs on the orchestrator.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use relay_client::PipelineApi;
use relay_core::domain::job::{ArtifactRef, JobData};

use crate::config::Config;

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Show the details of a job
    Show {
        /// Job ID
        id: String,

        /// Print the raw job data as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Handle job commands
///
/// # Arguments
/// * `command` - The job command to execute
/// * `config` - The CLI configuration
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        JobCommands::Show { id, json } => show_job(&client, &id, json).await,
    }
}

async fn show_job(client: &dyn PipelineApi, id: &str, json: bool) -> Result<()> {
    let data = client
        .get_job_details(id)
        .await
        .with_context(|| format!("Failed to fetch job {}", id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        print_job_details(id, &data);
    }
    Ok(())
}

/// Print detailed job information
fn print_job_details(id: &str, data: &JobData) {
    println!("{}", "Job Details:".bold());
    println!("  ID:        {}", id.cyan());

    match &data.pipeline_context {
        Some(ctx) => {
            println!("  Pipeline:  {}", ctx.pipeline_name);
            println!("  Stage:     {}", ctx.stage.name);
            println!("  Action:    {}", ctx.action.name);
        }
        None => println!("  Pipeline:  {}", "unknown".dimmed()),
    }

    if let Some(key) = &data.encryption_key {
        println!(
            "  Key:       {} {}",
            key.kind.as_deref().unwrap_or("-"),
            key.id.as_deref().unwrap_or_default().dimmed()
        );
    }

    print_artifacts("Input artifacts:", &data.input_artifacts);
    print_artifacts("Output artifacts:", &data.output_artifacts);
}

fn print_artifacts(title: &str, artifacts: &[ArtifactRef]) {
    println!("\n{}", title.bold());
    if artifacts.is_empty() {
        println!("  {}", "none".dimmed());
        return;
    }
    for artifact in artifacts {
        println!(
            "  {} {} {}",
            "▸".cyan(),
            artifact.name,
            artifact.storage().to_string().dimmed()
        );
    }
}
