//! Pattern command handlers
//!
//! Offline preview of how a path pattern resolves, without a server.

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use colored::*;
use datawatch_core::domain::pattern::PathPattern;
use datawatch_core::domain::variable::{Variable, VariableSet};

use crate::types::parse_var;

/// Pattern subcommands
#[derive(Subcommand)]
pub enum PatternCommands {
    /// Resolve a pattern against variables
    ///
    /// YEAR, MONTH, DAY and HOUR default to the current UTC time.
    Resolve {
        /// Path pattern, e.g. /data/${YEAR}/${MONTH}/${DAY}
        pattern: String,

        /// Variable as NAME=VALUE[:INCREMENT] (repeatable)
        #[arg(short, long = "var", value_parser = parse_var)]
        vars: Vec<(String, Variable)>,

        /// Also show this many following windows
        #[arg(short, long, default_value = "0")]
        windows: usize,
    },
}

/// Handle pattern commands
pub fn handle_pattern_command(command: PatternCommands) -> Result<()> {
    match command {
        PatternCommands::Resolve {
            pattern,
            vars,
            windows,
        } => {
            let mut variables: VariableSet = vars.into_iter().collect();
            variables.fill_calendar_defaults(Utc::now());

            for (i, path) in resolve_windows(&PathPattern::new(pattern), variables, windows)?
                .into_iter()
                .enumerate()
            {
                if i == 0 {
                    println!("{}", path.cyan().bold());
                } else {
                    println!("{}", path.dimmed());
                }
            }
            Ok(())
        }
    }
}

/// The resolved path for the current window and `windows` following ones
fn resolve_windows(
    pattern: &PathPattern,
    mut variables: VariableSet,
    windows: usize,
) -> Result<Vec<String>> {
    let mut paths = Vec::with_capacity(windows + 1);
    paths.push(pattern.resolve(&variables)?);
    for _ in 0..windows {
        variables.advance();
        paths.push(pattern.resolve(&variables)?);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_windows_rolls_calendar() {
        let variables = VariableSet::new()
            .with("YEAR", Variable::fixed(2023))
            .with("MONTH", Variable::fixed(12))
            .with("DAY", Variable::new(31, 1))
            .with("HOUR", Variable::fixed(0));
        let paths = resolve_windows(
            &PathPattern::new("/d/${YEAR}/${MONTH}/${DAY}"),
            variables,
            2,
        )
        .unwrap();
        assert_eq!(paths, vec!["/d/2023/12/31", "/d/2024/1/1", "/d/2024/1/2"]);
    }

    #[test]
    fn test_resolve_windows_reports_unknown_variable() {
        let err = resolve_windows(&PathPattern::new("/d/${REGION}"), VariableSet::new(), 0)
            .unwrap_err();
        assert!(err.to_string().contains("REGION"));
    }
}
