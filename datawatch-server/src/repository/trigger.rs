//! Trigger Repository
//!
//! Postgres implementation of the engine's trigger store.

use async_trait::async_trait;
use datawatch_core::domain::trigger::Trigger;
use datawatch_engine::error::StoreError;
use datawatch_engine::repository::TriggerStore;
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

pub struct PgTriggerStore {
    pool: PgPool,
}

impl PgTriggerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl TriggerStore for PgTriggerStore {
    async fn insert(&self, trigger: &Trigger) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let mut stored = trigger.clone();
        stored.id = id;
        let definition = serde_json::to_value(&stored)?;

        sqlx::query(
            r#"
            INSERT INTO triggers (
                id, data_source, principal, project_id, flow_name,
                submit_user, submit_time, last_modify_time, definition
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(&stored.data_source)
        .bind(&stored.principal)
        .bind(stored.project_id)
        .bind(&stored.flow_name)
        .bind(&stored.submit_user)
        .bind(stored.submit_time)
        .bind(stored.last_modify_time)
        .bind(definition)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(id)
    }

    async fn update(&self, trigger: &Trigger) -> Result<(), StoreError> {
        let definition = serde_json::to_value(trigger)?;

        let result = sqlx::query(
            r#"
            UPDATE triggers
            SET data_source = $1, principal = $2, project_id = $3, flow_name = $4,
                last_modify_time = $5, definition = $6
            WHERE id = $7
            "#,
        )
        .bind(&trigger.data_source)
        .bind(&trigger.principal)
        .bind(trigger.project_id)
        .bind(&trigger.flow_name)
        .bind(trigger.last_modify_time)
        .bind(definition)
        .bind(trigger.id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(trigger.id));
        }
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM triggers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn list_by_source(&self, source: &str) -> Result<Vec<Trigger>, StoreError> {
        let rows = sqlx::query_as::<_, TriggerRow>(
            r#"
            SELECT id, definition
            FROM triggers
            WHERE data_source = $1
            ORDER BY submit_time ASC, id ASC
            "#,
        )
        .bind(source)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(decode_rows(rows))
    }
}

/// Decodes listed rows, skipping any whose definition no longer parses
fn decode_rows(rows: Vec<TriggerRow>) -> Vec<Trigger> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            match Trigger::try_from(row) {
                Ok(trigger) => Some(trigger),
                Err(e) => {
                    error!("Skipping stored trigger {}: {}", id, e);
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct TriggerRow {
    id: Uuid,
    definition: serde_json::Value,
}

impl TryFrom<TriggerRow> for Trigger {
    type Error = StoreError;

    fn try_from(row: TriggerRow) -> Result<Self, Self::Error> {
        let mut trigger: Trigger = serde_json::from_value(row.definition)?;
        // the column is authoritative
        trigger.id = row.id;
        Ok(trigger)
    }
}
