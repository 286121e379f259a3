//! Trigger API Handlers
//!
//! HTTP endpoints for trigger management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use datawatch_core::domain::trigger::Trigger;
use datawatch_core::dto::trigger::{CreateTrigger, ListTriggers, TriggerSummary};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::ApiResult;

/// POST /trigger/create
/// Create and arm a new trigger
pub async fn create_trigger(
    State(state): State<AppState>,
    Json(req): Json<CreateTrigger>,
) -> ApiResult<Json<Trigger>> {
    tracing::info!(
        "Creating trigger for flow {}:{} as {}",
        req.project_id,
        req.flow_name,
        req.principal
    );

    let trigger = state.engine.manager().create_trigger(req).await?;
    Ok(Json(trigger))
}

/// GET /trigger/list
/// List triggers of a data source
pub async fn list_triggers(
    State(state): State<AppState>,
    Query(query): Query<ListTriggers>,
) -> ApiResult<Json<Vec<TriggerSummary>>> {
    tracing::debug!("Listing triggers (source: {:?})", query.source);

    let triggers = state
        .engine
        .manager()
        .list_triggers(query.source.as_deref())
        .await?;

    Ok(Json(triggers.into_iter().map(TriggerSummary::from).collect()))
}

/// GET /trigger/{id}
/// Get an armed trigger by ID
pub async fn get_trigger(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Trigger>> {
    tracing::debug!("Getting trigger: {}", id);

    let trigger = state.engine.manager().get_trigger(id)?;
    Ok(Json(trigger))
}

/// PUT /trigger/{id}
/// Replace a trigger's definition and re-arm it
pub async fn update_trigger(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut trigger): Json<Trigger>,
) -> ApiResult<Json<Trigger>> {
    tracing::info!("Updating trigger: {}", id);

    trigger.id = id;
    let trigger = state.engine.manager().update_trigger(trigger).await?;
    Ok(Json(trigger))
}

/// DELETE /trigger/{id}
/// Remove a trigger
pub async fn delete_trigger(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Removing trigger: {}", id);

    state.engine.manager().remove_trigger(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
