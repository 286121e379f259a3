//! Trigger-related API endpoints

use crate::DatawatchClient;
use crate::error::Result;
use datawatch_core::domain::trigger::Trigger;
use datawatch_core::dto::trigger::{CreateTrigger, TriggerSummary};
use uuid::Uuid;

impl DatawatchClient {
    // =============================================================================
    // Trigger Management
    // =============================================================================

    /// Create and arm a new trigger
    ///
    /// # Returns
    /// The stored trigger, with calendar variables filled in
    pub async fn create_trigger(&self, req: CreateTrigger) -> Result<Trigger> {
        let response = self
            .client
            .post(self.url("/trigger/create"))
            .json(&req)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// List triggers of a data source
    ///
    /// # Arguments
    /// * `source` - The data source; the server's own when `None`
    pub async fn list_triggers(&self, source: Option<&str>) -> Result<Vec<TriggerSummary>> {
        let mut request = self.client.get(self.url("/trigger/list"));
        if let Some(source) = source {
            request = request.query(&[("source", source)]);
        }
        let response = request.send().await?;

        self.handle_response(response).await
    }

    /// Get an armed trigger by ID
    pub async fn get_trigger(&self, trigger_id: Uuid) -> Result<Trigger> {
        let response = self
            .client
            .get(self.url(&format!("/trigger/{}", trigger_id)))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Replace a trigger's definition
    ///
    /// The server re-arms the trigger and returns the stored version.
    pub async fn update_trigger(&self, trigger_id: Uuid, trigger: &Trigger) -> Result<Trigger> {
        let response = self
            .client
            .put(self.url(&format!("/trigger/{}", trigger_id)))
            .json(trigger)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Remove a trigger
    pub async fn remove_trigger(&self, trigger_id: Uuid) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/trigger/{}", trigger_id)))
            .send()
            .await?;

        self.handle_empty_response(response).await
    }
}
