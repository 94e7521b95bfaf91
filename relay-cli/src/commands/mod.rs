//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod action;
mod job;
mod trigger;

pub use job::JobCommands;
pub use trigger::TriggerCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Trigger definition checks
    Trigger {
        #[command(subcommand)]
        command: TriggerCommands,
    },
    /// Job inspection
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// List custom action types registered in the account
    ActionTypes,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Trigger { command } => trigger::handle_trigger_command(command),
        Commands::Job { command } => job::handle_job_command(command, config).await,
        Commands::ActionTypes => action::list_action_types(config).await,
    }
}
