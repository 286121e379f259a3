//! API Module
//!
//! HTTP administrative surface over the trigger engine.
//! Each submodule handles endpoints for a specific domain.

pub mod checker;
pub mod error;
pub mod health;
pub mod trigger;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use datawatch_engine::Engine;
use tower_http::trace::TraceLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

/// Create the main API router with all endpoints
pub fn create_router(engine: Arc<Engine>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Trigger endpoints
        .route("/trigger/create", post(trigger::create_trigger))
        .route("/trigger/list", get(trigger::list_triggers))
        .route("/trigger/{id}", get(trigger::get_trigger))
        .route("/trigger/{id}", put(trigger::update_trigger))
        .route("/trigger/{id}", delete(trigger::delete_trigger))
        // Checker endpoints
        .route("/checker/status", get(checker::checker_status))
        // Add state and middleware
        .with_state(AppState { engine })
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use datawatch_core::domain::trigger::Trigger;
    use datawatch_core::dto::trigger::{CheckerStatus, TriggerSummary};
    use datawatch_engine::clock::SystemClock;
    use datawatch_engine::config::EngineConfig;
    use datawatch_engine::repository::{InMemoryTriggerStore, LogActionExecutor, MemoryBackend};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt;

    async fn app() -> Router {
        let config = EngineConfig::default()
            .with_storage_backend("memory")
            .with_poll_interval(Duration::from_secs(3600));
        let engine = Engine::start(
            config,
            Arc::new(MemoryBackend::new()),
            Arc::new(InMemoryTriggerStore::new()),
            Arc::new(LogActionExecutor),
            Arc::new(SystemClock),
        )
        .await
        .unwrap();
        create_router(Arc::new(engine))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn create_body(pattern: &str) -> Value {
        json!({
            "path_patterns": [pattern],
            "principal": "etl",
            "variables": { "DAY": [13, 1] },
            "time_to_expire": "12h",
            "project_id": 4,
            "flow_name": "daily",
            "recurrence": "recurring",
            "submit_user": "azkaban"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok", "data_source": "hdfs" }));
    }

    #[tokio::test]
    async fn test_trigger_crud() {
        let app = app().await;

        let (status, created) = send(
            &app,
            "POST",
            "/trigger/create",
            Some(create_body("/events/${YEAR}/${DAY}")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let trigger: Trigger = serde_json::from_value(created).unwrap();
        assert_eq!(trigger.variables.value("DAY"), Some(13));
        assert!(trigger.variables.contains("YEAR"));

        let (status, fetched) = send(&app, "GET", &format!("/trigger/{}", trigger.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_value::<Trigger>(fetched).unwrap(), trigger);

        let (status, listed) = send(&app, "GET", "/trigger/list", None).await;
        assert_eq!(status, StatusCode::OK);
        let listed: Vec<TriggerSummary> = serde_json::from_value(listed).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, trigger.id);

        let (status, listed) = send(&app, "GET", "/trigger/list?source=s3", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed, json!([]));

        let (status, _) = send(&app, "DELETE", &format!("/trigger/{}", trigger.id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) =
            send(&app, "DELETE", &format!("/trigger/{}", trigger.id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_update_trigger() {
        let app = app().await;
        let (_, created) = send(
            &app,
            "POST",
            "/trigger/create",
            Some(create_body("/events/${DAY}")),
        )
        .await;
        let mut trigger: Trigger = serde_json::from_value(created).unwrap();
        trigger.flow_name = "hourly".to_string();

        let uri = format!("/trigger/{}", trigger.id);
        let (status, updated) = send(
            &app,
            "PUT",
            &uri,
            Some(serde_json::to_value(&trigger).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["flow_name"], "hourly");

        let (_, fetched) = send(&app, "GET", &uri, None).await;
        assert_eq!(fetched["flow_name"], "hourly");

        let missing = format!("/trigger/{}", uuid::Uuid::new_v4());
        let (status, _) = send(
            &app,
            "PUT",
            &missing,
            Some(serde_json::to_value(&trigger).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_with_unknown_variable_is_bad_request() {
        let app = app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/trigger/create",
            Some(create_body("/events/${REGION}")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("REGION"));
    }

    #[tokio::test]
    async fn test_get_unknown_trigger_is_not_found() {
        let app = app().await;
        let (status, _) = send(
            &app,
            "GET",
            "/trigger/00000000-0000-0000-0000-000000000000",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_checker_status_counts_armed_triggers() {
        let app = app().await;
        send(&app, "POST", "/trigger/create", Some(create_body("/a"))).await;

        let (status, body) = send(&app, "GET", "/checker/status", None).await;
        assert_eq!(status, StatusCode::OK);
        let status: CheckerStatus = serde_json::from_value(body).unwrap();
        assert_eq!(status.armed_triggers, 1);
        assert_eq!(status.cached_entries, 0);
    }
}
