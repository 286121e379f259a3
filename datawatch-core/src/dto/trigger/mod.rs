//! Trigger DTOs for the administrative API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::pattern::PathPattern;
use crate::domain::trigger::{Recurrence, Trigger};
use crate::domain::variable::VariableSet;

/// Request to create a new trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTrigger {
    pub path_patterns: Vec<PathPattern>,
    pub principal: String,
    #[serde(default)]
    pub variables: VariableSet,
    /// Period string such as `24h`; the server default applies when absent
    #[serde(default)]
    pub time_to_expire: Option<String>,
    pub project_id: i64,
    pub flow_name: String,
    /// Fire a webhook instead of launching the flow
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub recurrence: Recurrence,
    pub submit_user: String,
}

/// Query parameters for listing triggers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListTriggers {
    pub source: Option<String>,
}

/// Trigger summary for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSummary {
    pub id: Uuid,
    pub description: String,
    pub data_source: String,
    pub principal: String,
    pub path_patterns: Vec<PathPattern>,
    pub project_id: i64,
    pub flow_name: String,
    pub recurrence: Recurrence,
    pub submit_user: String,
    pub submit_time: DateTime<Utc>,
    pub armed_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Trigger> for TriggerSummary {
    fn from(trigger: Trigger) -> Self {
        TriggerSummary {
            id: trigger.id,
            description: trigger.description(),
            expires_at: trigger.expires_at(),
            data_source: trigger.data_source,
            principal: trigger.principal,
            path_patterns: trigger.path_patterns,
            project_id: trigger.project_id,
            flow_name: trigger.flow_name,
            recurrence: trigger.recurrence,
            submit_user: trigger.submit_user,
            submit_time: trigger.submit_time,
            armed_at: trigger.armed_at,
        }
    }
}

/// Snapshot of the existence cache and pending-check queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerStatus {
    pub cached_entries: usize,
    pub pending_checks: usize,
    pub armed_triggers: usize,
}
