//! Checker status and health endpoints

use crate::DatawatchClient;
use crate::error::Result;
use datawatch_core::dto::trigger::CheckerStatus;

impl DatawatchClient {
    /// Existence cache size, pending checks, and armed trigger count
    pub async fn checker_status(&self) -> Result<CheckerStatus> {
        let response = self.client.get(self.url("/checker/status")).send().await?;

        self.handle_response(response).await
    }

    /// Whether the server answers its health check
    pub async fn health(&self) -> Result<()> {
        let response = self.client.get(self.url("/health")).send().await?;

        self.handle_empty_response(response).await
    }
}
