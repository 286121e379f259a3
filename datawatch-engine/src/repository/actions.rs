//! Action executors
//!
//! Invoked once per satisfied arming period with the trigger's action.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use datawatch_core::domain::trigger::TriggerAction;
use reqwest::Client;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::ActionError;

/// Details of the firing passed along with the action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FireContext {
    pub trigger_id: Uuid,
    /// Resolved paths that satisfied the trigger
    pub paths: Vec<String>,
    pub fired_at: DateTime<Utc>,
}

/// Executes a trigger's downstream action
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn fire(&self, action: &TriggerAction, ctx: &FireContext) -> Result<(), ActionError>;
}

/// Executor that only records firings in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogActionExecutor;

#[async_trait]
impl ActionExecutor for LogActionExecutor {
    async fn fire(&self, action: &TriggerAction, ctx: &FireContext) -> Result<(), ActionError> {
        match action {
            TriggerAction::ExecuteFlow {
                project_id,
                flow_name,
            } => info!(
                "Trigger {} would execute flow {} of project {} ({} paths)",
                ctx.trigger_id,
                flow_name,
                project_id,
                ctx.paths.len()
            ),
            TriggerAction::Webhook { url } => {
                info!("Trigger {} would call webhook {}", ctx.trigger_id, url)
            }
        }
        Ok(())
    }
}

/// HTTP implementation of ActionExecutor
///
/// Flow executions are POSTed to `{base_url}/flow/execute`; webhooks are
/// POSTed to their own URL. Both carry the fire context as JSON.
pub struct HttpActionExecutor {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct ExecuteFlowRequest<'a> {
    project_id: i64,
    flow_name: &'a str,
    #[serde(flatten)]
    context: &'a FireContext,
}

impl HttpActionExecutor {
    /// Creates a new HTTP action executor
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the flow executor (e.g., "http://localhost:8081")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn check(response: reqwest::Response) -> Result<(), ActionError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ActionError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ActionExecutor for HttpActionExecutor {
    async fn fire(&self, action: &TriggerAction, ctx: &FireContext) -> Result<(), ActionError> {
        let response = match action {
            TriggerAction::ExecuteFlow {
                project_id,
                flow_name,
            } => {
                let url = format!("{}/flow/execute", self.base_url);
                let body = ExecuteFlowRequest {
                    project_id: *project_id,
                    flow_name,
                    context: ctx,
                };
                self.client.post(&url).json(&body).send().await?
            }
            TriggerAction::Webhook { url } => self.client.post(url).json(ctx).send().await?,
        };

        Self::check(response).await
    }
}
