//! Trigger command handlers
//!
//! Offline checks of a trigger definition file, with the same rules the
//! trigger applies before every poll.

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;
use relay_core::domain::trigger::{TriggerConfig, TriggerDefinition};
use relay_core::params;
use relay_core::validate::validate_settings;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Trigger subcommands
#[derive(Subcommand)]
pub enum TriggerCommands {
    /// Validate a trigger definition file
    Validate {
        /// Path to the JSON trigger definition
        #[arg(short, long)]
        file: PathBuf,

        /// Reject unresolved %references% instead of skipping their checks
        #[arg(long)]
        resolved: bool,
    },
}

/// Handle trigger commands
///
/// # Arguments
/// * `command` - The trigger command to execute
pub fn handle_trigger_command(command: TriggerCommands) -> Result<()> {
    match command {
        TriggerCommands::Validate { file, resolved } => validate_file(&file, !resolved),
    }
}

fn validate_file(path: &Path, accept_references: bool) -> Result<()> {
    let (definition, invalids) = check_definition(path, accept_references)?;

    if !invalids.is_empty() {
        println!(
            "{}",
            format!("Found {} invalid parameter(s):", invalids.len())
                .red()
                .bold()
        );
        for (name, message) in &invalids {
            println!("  {} {}", "✗".red(), name.cyan());
            println!("    {}", message);
        }
        bail!("Trigger definition {} is invalid", path.display());
    }

    println!("{}", "✓ Trigger definition is valid".green().bold());
    println!("  {}", params::describe_trigger(&definition.parameters).dimmed());
    if let Some(id) = &definition.id {
        println!("  ID:      {}", id.cyan());
    }

    // Fully resolved definitions also get their typed view printed
    if let Ok(config) = TriggerConfig::from_params(&definition.parameters) {
        println!("  Region:  {}", config.credentials.region);
        match config.poll_interval {
            Some(interval) => println!("  Polling: every {}s", interval.as_secs()),
            None => println!("  Polling: {}", "default interval".dimmed()),
        }
        if !config.artifact_path_specs.is_empty() {
            println!("\n{}", "Output artifact paths:".bold());
            for spec in &config.artifact_path_specs {
                println!("  {} {}", "▸".cyan(), spec);
            }
        }
    }

    Ok(())
}

/// Loads the definition and returns it with its invalid parameters
fn check_definition(
    path: &Path,
    accept_references: bool,
) -> Result<(TriggerDefinition, BTreeMap<String, String>)> {
    let definition = TriggerDefinition::load(path)
        .with_context(|| format!("Failed to load trigger definition {}", path.display()))?;
    let invalids = validate_settings(&definition.parameters, accept_references);
    Ok((definition, invalids))
}
