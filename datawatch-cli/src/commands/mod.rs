//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod pattern;
mod trigger;

pub use pattern::PatternCommands;
pub use trigger::TriggerCommands;

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use datawatch_client::DatawatchClient;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Trigger management
    Trigger {
        #[command(subcommand)]
        command: TriggerCommands,
    },
    /// Offline path pattern tools
    Pattern {
        #[command(subcommand)]
        command: PatternCommands,
    },
    /// Show server health and checker counters
    Status,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Trigger { command } => trigger::handle_trigger_command(command, config).await,
        Commands::Pattern { command } => pattern::handle_pattern_command(command),
        Commands::Status => show_status(config).await,
    }
}

async fn show_status(config: &Config) -> Result<()> {
    let client = DatawatchClient::new(&config.server_url);
    client.health().await?;
    let status = client.checker_status().await?;

    println!("{} {}", "✓".green().bold(), config.server_url.bold());
    println!("  Armed triggers:  {}", status.armed_triggers.to_string().cyan());
    println!("  Pending checks:  {}", status.pending_checks);
    println!("  Cached entries:  {}", status.cached_entries);

    Ok(())
}
