//! Action type command handler

use anyhow::Result;
use colored::*;
use relay_client::PipelineApi;
use relay_core::domain::action::{ActionOwner, ActionType};
use relay_core::params::ACTION_PROVIDER;

use crate::config::Config;

/// List custom action types, highlighting the ones the relay polls for
pub async fn list_action_types(config: &Config) -> Result<()> {
    let client = config.client();
    let types = client.list_action_types(ActionOwner::Custom).await?;

    if types.is_empty() {
        println!("{}", "No custom action types registered.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("Found {} custom action type(s):", types.len()).bold()
    );
    println!();
    for action_type in &types {
        print_action_type(action_type);
    }

    if !types.iter().any(|t| t.id.provider == ACTION_PROVIDER) {
        println!(
            "{}",
            format!("No {} action type found; the trigger will not poll.", ACTION_PROVIDER).yellow()
        );
    }

    Ok(())
}

fn print_action_type(action_type: &ActionType) {
    let id = &action_type.id;
    let provider = if id.provider == ACTION_PROVIDER {
        id.provider.green().bold()
    } else {
        id.provider.normal()
    };

    println!("  {} {} v{}", "▸".cyan(), provider, id.version);
    println!("    Category: {}", format!("{:?}", id.category).dimmed());
}
