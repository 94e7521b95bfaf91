//! Relay CLI
//!
//! Command-line interface for operating the pipeline relay: checking trigger
//! definitions offline and inspecting the orchestrator.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "AWS CodePipeline to TeamCity relay CLI", long_about = None)]
struct Cli {
    /// Orchestrator endpoint; derived from the region when unset
    #[arg(long, env = "ORCHESTRATOR_URL")]
    orchestrator_url: Option<String>,

    /// Region of the orchestrator
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    region: String,

    /// Bearer token sent to the orchestrator
    #[arg(long, env = "ORCHESTRATOR_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        orchestrator_url: cli.orchestrator_url,
        region: cli.region,
        token: cli.token,
    };

    handle_command(cli.command, &config).await
}
