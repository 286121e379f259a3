use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // The full trigger lives in `definition`; the other columns are for
    // filtering and operators
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS triggers (
            id UUID PRIMARY KEY,
            data_source VARCHAR(255) NOT NULL,
            principal VARCHAR(255) NOT NULL,
            project_id BIGINT NOT NULL,
            flow_name VARCHAR(255) NOT NULL,
            submit_user VARCHAR(255) NOT NULL,
            submit_time TIMESTAMPTZ NOT NULL,
            last_modify_time TIMESTAMPTZ NOT NULL,
            definition JSONB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_triggers_data_source ON triggers(data_source)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_triggers_flow ON triggers(project_id, flow_name)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
