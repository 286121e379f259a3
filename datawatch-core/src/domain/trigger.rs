//! Trigger domain model
//!
//! A trigger waits for every one of its path patterns to exist in the storage
//! backend and then fires its action once. It expires if the data does not
//! appear within `time_to_expire` of being armed.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::check_key::CheckKey;
use crate::domain::pattern::{PathPattern, PatternError};
use crate::domain::variable::VariableSet;
use crate::dto::checker::CheckerDefinition;

/// A data-availability trigger
///
/// Owned by the trigger store; the engine keeps an armed copy per id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: Uuid,
    pub data_source: String,
    pub path_patterns: Vec<PathPattern>,
    pub variables: VariableSet,
    pub principal: String,
    #[serde(with = "crate::period::serde_period")]
    pub time_to_expire: Duration,
    pub action: TriggerAction,
    #[serde(default)]
    pub recurrence: Recurrence,
    pub project_id: i64,
    pub flow_name: String,
    pub last_modify_time: DateTime<Utc>,
    pub submit_time: DateTime<Utc>,
    /// Start of the current arming period
    pub armed_at: DateTime<Utc>,
    pub submit_user: String,
}

/// What happens when a trigger's data is available
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerAction {
    /// Launch a flow in the orchestration layer
    ExecuteFlow { project_id: i64, flow_name: String },
    /// POST a notification to an arbitrary URL
    Webhook { url: String },
}

/// What happens to a trigger after it fires
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    /// Remove the trigger
    #[default]
    Once,
    /// Advance the variables and arm again for the next window
    Recurring,
}

impl Trigger {
    /// The (project, flow) pair this trigger feeds
    pub fn flow_key(&self) -> (i64, &str) {
        (self.project_id, &self.flow_name)
    }

    pub fn description(&self) -> String {
        format!("Data trigger {}", self.id)
    }

    /// Fails on the first pattern referencing an undeclared variable
    pub fn validate_patterns(&self) -> Result<(), PatternError> {
        self.path_patterns
            .iter()
            .try_for_each(|pattern| pattern.check(&self.variables))
    }

    /// Resolves every pattern for the current window
    pub fn check_keys(&self) -> Result<Vec<CheckKey>, PatternError> {
        self.path_patterns
            .iter()
            .map(|pattern| {
                pattern
                    .resolve(&self.variables)
                    .map(|path| CheckKey::new(path, self.principal.clone()))
            })
            .collect()
    }

    /// End of the current arming period, `None` if it does not fit in a
    /// timestamp
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let ttl = TimeDelta::from_std(self.time_to_expire).ok()?;
        self.armed_at.checked_add_signed(ttl)
    }

    /// Whether more than `time_to_expire` has passed since arming
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|deadline| now > deadline)
    }

    /// Starts a new arming period
    pub fn rearm(&mut self, now: DateTime<Utc>) {
        self.armed_at = now;
        self.last_modify_time = now;
    }

    /// The condition-checker view of this trigger
    pub fn checker_definition(&self, checker_type: &str) -> CheckerDefinition {
        CheckerDefinition {
            checker_type: checker_type.to_string(),
            checker_id: format!("{}DataChecker", self.data_source),
            path_patterns: self.path_patterns.clone(),
            principal: self.principal.clone(),
            variables: self.variables.clone(),
        }
    }
}
