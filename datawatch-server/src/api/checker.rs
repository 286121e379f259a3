//! Checker API Handler

use axum::{Json, extract::State};
use datawatch_core::dto::trigger::CheckerStatus;

use crate::api::AppState;

/// GET /checker/status
/// Existence cache and pending-check counts
pub async fn checker_status(State(state): State<AppState>) -> Json<CheckerStatus> {
    Json(state.engine.status())
}
