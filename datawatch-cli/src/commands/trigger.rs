//! Trigger command handlers
//!
//! Handles all trigger-related CLI commands: creation, listing, viewing,
//! and removal.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use datawatch_client::DatawatchClient;
use datawatch_core::domain::pattern::PathPattern;
use datawatch_core::domain::trigger::{Recurrence, Trigger, TriggerAction};
use datawatch_core::domain::variable::{Variable, VariableSet};
use datawatch_core::dto::trigger::{CreateTrigger, TriggerSummary};
use datawatch_core::period::parse_period;

use crate::config::Config;
use crate::id_resolver::resolve_trigger_id;
use crate::types::{IdOrPrefix, parse_var};

/// Trigger subcommands
#[derive(Subcommand)]
pub enum TriggerCommands {
    /// Create a trigger waiting on one or more path patterns
    Create {
        /// Path pattern, e.g. /data/${YEAR}/${MONTH}/${DAY} (repeatable)
        #[arg(short, long = "pattern", required = true)]
        patterns: Vec<String>,

        /// Principal the existence checks run as
        #[arg(long)]
        principal: String,

        /// Variable as NAME=VALUE[:INCREMENT] (repeatable)
        #[arg(short, long = "var", value_parser = parse_var)]
        vars: Vec<(String, Variable)>,

        /// Time to expire, e.g. 24h or 7d (server default if omitted)
        #[arg(short, long)]
        expire: Option<String>,

        /// Project the flow belongs to
        #[arg(long)]
        project: i64,

        /// Flow to launch once the data is available
        #[arg(long)]
        flow: String,

        /// POST to this URL instead of launching the flow
        #[arg(long)]
        webhook: Option<String>,

        /// Advance to the next window after firing instead of retiring
        #[arg(long)]
        recurring: bool,

        /// Submitting user
        #[arg(long, env = "USER", default_value = "datawatch")]
        user: String,
    },
    /// List triggers
    List {
        /// Data source (the server's own if omitted)
        #[arg(short, long)]
        source: Option<String>,
    },
    /// Get trigger details
    Get {
        /// Trigger ID or unambiguous prefix
        id: String,
    },
    /// Change a trigger's patterns, expiry, or flow and re-arm it
    Update {
        /// Trigger ID or unambiguous prefix
        id: String,

        /// Replacement path patterns (repeatable)
        #[arg(short, long = "pattern")]
        patterns: Vec<String>,

        /// New time to expire, e.g. 24h or 7d
        #[arg(short, long)]
        expire: Option<String>,

        /// New flow to launch
        #[arg(long)]
        flow: Option<String>,
    },
    /// Remove a trigger
    Remove {
        /// Trigger ID or unambiguous prefix
        id: String,
    },
}

/// Handle trigger commands
pub async fn handle_trigger_command(command: TriggerCommands, config: &Config) -> Result<()> {
    let client = DatawatchClient::new(&config.server_url);

    match command {
        TriggerCommands::Create {
            patterns,
            principal,
            vars,
            expire,
            project,
            flow,
            webhook,
            recurring,
            user,
        } => {
            let req = CreateTrigger {
                path_patterns: patterns.into_iter().map(PathPattern::new).collect(),
                principal,
                variables: vars.into_iter().collect::<VariableSet>(),
                time_to_expire: expire,
                project_id: project,
                flow_name: flow,
                webhook_url: webhook,
                recurrence: if recurring {
                    Recurrence::Recurring
                } else {
                    Recurrence::Once
                },
                submit_user: user,
            };
            create_trigger(&client, req).await
        }
        TriggerCommands::List { source } => list_triggers(&client, source.as_deref()).await,
        TriggerCommands::Get { id } => get_trigger(&client, &id).await,
        TriggerCommands::Update {
            id,
            patterns,
            expire,
            flow,
        } => update_trigger(&client, &id, patterns, expire, flow).await,
        TriggerCommands::Remove { id } => remove_trigger(&client, &id).await,
    }
}

/// Create a new trigger
async fn create_trigger(client: &DatawatchClient, req: CreateTrigger) -> Result<()> {
    let trigger = client.create_trigger(req).await?;

    println!("{}", "✓ Trigger created successfully!".green().bold());
    println!("  ID:       {}", trigger.id.to_string().cyan());
    println!(
        "  Flow:     {}",
        format!("{}:{}", trigger.project_id, trigger.flow_name).bold()
    );
    for pattern in &trigger.path_patterns {
        println!("  Pattern:  {}", pattern.as_str().dimmed());
    }
    if let Some(expires_at) = trigger.expires_at() {
        println!(
            "  Expires:  {}",
            expires_at.format("%Y-%m-%d %H:%M:%S").to_string().yellow()
        );
    }

    Ok(())
}

/// List triggers of a data source
async fn list_triggers(client: &DatawatchClient, source: Option<&str>) -> Result<()> {
    let triggers = client.list_triggers(source).await?;

    if triggers.is_empty() {
        println!("{}", "No triggers found.".yellow());
    } else {
        println!("{}", format!("Found {} trigger(s):", triggers.len()).bold());
        println!();
        for trigger in triggers {
            print_trigger_summary(&trigger);
        }
    }

    Ok(())
}

/// Get and display a single trigger
async fn get_trigger(client: &DatawatchClient, id: &str) -> Result<()> {
    let id_or_prefix = IdOrPrefix::parse(id);
    let uuid = resolve_trigger_id(client, &id_or_prefix).await?;

    let trigger = client.get_trigger(uuid).await?;

    print_trigger_details(&trigger);

    Ok(())
}

/// Update a trigger in place
async fn update_trigger(
    client: &DatawatchClient,
    id: &str,
    patterns: Vec<String>,
    expire: Option<String>,
    flow: Option<String>,
) -> Result<()> {
    let id_or_prefix = IdOrPrefix::parse(id);
    let uuid = resolve_trigger_id(client, &id_or_prefix).await?;

    let mut trigger = client.get_trigger(uuid).await?;
    if !patterns.is_empty() {
        trigger.path_patterns = patterns.into_iter().map(PathPattern::new).collect();
    }
    if let Some(expire) = expire {
        trigger.time_to_expire = parse_period(&expire)?;
    }
    if let Some(flow) = flow {
        if let TriggerAction::ExecuteFlow { flow_name, .. } = &mut trigger.action {
            *flow_name = flow.clone();
        }
        trigger.flow_name = flow;
    }

    let updated = client.update_trigger(uuid, &trigger).await?;

    println!(
        "{}",
        format!("✓ Trigger {} updated successfully!", updated.id)
            .green()
            .bold()
    );
    for pattern in &updated.path_patterns {
        println!("  Pattern:  {}", pattern.as_str().dimmed());
    }

    Ok(())
}

/// Remove a trigger
async fn remove_trigger(client: &DatawatchClient, id: &str) -> Result<()> {
    let id_or_prefix = IdOrPrefix::parse(id);
    let uuid = resolve_trigger_id(client, &id_or_prefix).await?;

    client.remove_trigger(uuid).await?;

    println!(
        "{}",
        format!("✓ Trigger {} removed successfully!", uuid)
            .green()
            .bold()
    );

    Ok(())
}

/// Print a trigger summary
fn print_trigger_summary(trigger: &TriggerSummary) {
    println!(
        "  {} {}",
        "▸".cyan(),
        format!("{}:{}", trigger.project_id, trigger.flow_name).bold()
    );
    println!("    ID:       {}", trigger.id.to_string().dimmed());
    println!("    Source:   {}", trigger.data_source.dimmed());
    println!(
        "    Patterns: {}",
        trigger.path_patterns.len().to_string().dimmed()
    );
    println!(
        "    Armed:    {}",
        trigger
            .armed_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    if let Some(expires_at) = trigger.expires_at {
        println!(
            "    Expires:  {}",
            expires_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    println!();
}

/// Print detailed trigger information
fn print_trigger_details(trigger: &Trigger) {
    println!("{}", "Trigger Details:".bold());
    println!("  ID:          {}", trigger.id.to_string().cyan());
    println!("  Description: {}", trigger.description());
    let (project_id, flow_name) = trigger.flow_key();
    println!("  Flow:        {}:{}", project_id, flow_name);
    println!("  Source:      {}", trigger.data_source);
    println!("  Principal:   {}", trigger.principal);
    println!(
        "  Submitted:   {} by {}",
        trigger.submit_time.format("%Y-%m-%d %H:%M:%S"),
        trigger.submit_user
    );
    println!(
        "  Armed:       {}",
        trigger.armed_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!("  Recurrence:  {:?}", trigger.recurrence);
    match &trigger.action {
        TriggerAction::ExecuteFlow {
            project_id,
            flow_name,
        } => println!("  Action:      execute flow {}:{}", project_id, flow_name),
        TriggerAction::Webhook { url } => println!("  Action:      webhook {}", url),
    }

    println!("\n{}", "Patterns:".bold());
    for pattern in &trigger.path_patterns {
        let resolved = pattern
            .resolve(&trigger.variables)
            .unwrap_or_else(|e| e.to_string().red().to_string());
        println!(
            "  {} {}",
            pattern.as_str().dimmed(),
            format!("→ {}", resolved).cyan()
        );
    }

    if !trigger.variables.is_empty() {
        println!("\n{}", "Variables:".bold());
        for (name, var) in trigger.variables.iter() {
            println!("  {}", variable_line(name, var));
        }
    }
}

/// `NAME     VALUE (+INC)`, with the increment's sign always shown
fn variable_line(name: &str, var: &Variable) -> String {
    format!("{:<8} {} ({:+})", name, var.value, var.increment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_line_signs_increment() {
        assert_eq!(variable_line("DAY", &Variable::new(13, 1)), "DAY      13 (+1)");
        assert_eq!(variable_line("PART", &Variable::new(9, -1)), "PART     9 (-1)");
        assert_eq!(variable_line("YEAR", &Variable::fixed(2024)), "YEAR     2024 (+0)");
    }
}
