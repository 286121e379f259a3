use std::sync::Arc;

use anyhow::{Context, Result};
use datawatch_engine::Engine;
use datawatch_engine::clock::SystemClock;
use datawatch_engine::config::EngineConfig;
use datawatch_engine::repository::{
    ActionExecutor, BackendRegistry, HttpActionExecutor, InMemoryTriggerStore, LogActionExecutor,
    TriggerStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::repository::PgTriggerStore;

pub mod api;
pub mod db;
pub mod repository;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "datawatch_server=info,datawatch_engine=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Datawatch Server...");

    let config = EngineConfig::from_env().context("Failed to load engine configuration")?;
    tracing::info!(
        "Loaded configuration: data_source={}, storage_backend={}, poll_interval={:?}",
        config.data_source,
        config.storage_backend,
        config.poll_interval
    );

    let store = create_store().await?;

    let backend = BackendRegistry::with_defaults()
        .create(&config)
        .context("Failed to initialize storage backend")?;

    let executor: Arc<dyn ActionExecutor> = match &config.action_url {
        Some(url) => {
            tracing::info!("Firing actions against {}", url);
            Arc::new(HttpActionExecutor::new(url.clone()))
        }
        None => {
            tracing::warn!("DATAWATCH_ACTION_URL not set, actions will only be logged");
            Arc::new(LogActionExecutor)
        }
    };

    let engine = Arc::new(
        Engine::start(config, backend, store, executor, Arc::new(SystemClock))
            .await
            .context("Failed to start trigger engine")?,
    );

    // Build router with all API endpoints
    let app = api::create_router(Arc::clone(&engine));

    // Get bind address
    let addr =
        std::env::var("DATAWATCH_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;

    engine.shutdown().await;
    Ok(())
}

/// Postgres when `DATABASE_URL` is set, in-memory otherwise
async fn create_store() -> Result<Arc<dyn TriggerStore>> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        tracing::warn!("DATABASE_URL not set, triggers will not survive a restart");
        return Ok(Arc::new(InMemoryTriggerStore::new()));
    };

    tracing::info!("Connecting to database...");

    let pool = db::create_pool(&database_url)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Database connection pool created");

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(Arc::new(PgTriggerStore::new(pool)))
}
