use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::{AppError, AppResult};
use crate::models::{ErrorGroup, Event, NewErrorGroup, NewEvent};
use crate::store::{CreateOutcome, ErrorStore, StoreTransaction};

/// PostgreSQL-backed store.
///
/// At-most-once group creation relies on the `errors_grouping_hash_key`
/// unique constraint: a losing concurrent insert waits for the winner to
/// commit and then inserts nothing.
#[derive(Debug, Clone)]
pub struct PgErrorStore {
    pool: PgPool,
}

impl PgErrorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ErrorStore for PgErrorStore {
    async fn find_groups_by_hash(&self, grouping_hash: &str) -> AppResult<Vec<ErrorGroup>> {
        let groups = sqlx::query_as::<_, ErrorGroup>(
            "SELECT * FROM errors WHERE grouping_hash = $1 ORDER BY id",
        )
        .bind(grouping_hash)
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    async fn create_group_with_event(
        &self,
        group: &NewErrorGroup,
        event: &NewEvent,
        now: i64,
    ) -> AppResult<CreateOutcome> {
        let serialized_data = event.data.encode()?;

        let mut tx = self.pool.begin().await?;

        let created: Option<ErrorGroup> = sqlx::query_as(
            r#"
            INSERT INTO errors (grouping_hash, error_class, location, severity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (grouping_hash) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&group.grouping_hash)
        .bind(&group.error_class)
        .bind(&group.location)
        .bind(&group.severity)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(created) = created else {
            tx.rollback().await?;
            return Ok(CreateOutcome::Conflict);
        };

        let event = insert_event(&mut tx, created.id, event, &serialized_data, now).await?;

        tx.commit().await?;

        Ok(CreateOutcome::Created {
            group: created,
            event,
        })
    }

    async fn begin(&self) -> AppResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTransaction { tx }))
    }

    async fn events_for_group(&self, group_id: i64) -> AppResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE error_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}

/// Append-path transaction over a pooled connection
pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn append_event_to_group(
        &mut self,
        group_id: i64,
        event: &NewEvent,
        now: i64,
    ) -> AppResult<Event> {
        let serialized_data = event.data.encode()?;
        insert_event(&mut self.tx, group_id, event, &serialized_data, now).await
    }

    async fn touch_group_updated_at(&mut self, group_id: i64, now: i64) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE errors SET updated_at = GREATEST(updated_at, $2) WHERE id = $1")
                .bind(group_id)
                .bind(now)
                .execute(&mut *self.tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Error group {} not found", group_id)));
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

async fn insert_event(
    tx: &mut Transaction<'static, Postgres>,
    group_id: i64,
    event: &NewEvent,
    serialized_data: &[u8],
    now: i64,
) -> AppResult<Event> {
    let event = sqlx::query_as::<_, Event>(
        r#"
        INSERT INTO events (error_id, hostname, message, serialized_data, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(group_id)
    .bind(&event.hostname)
    .bind(&event.message)
    .bind(serialized_data)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;

    Ok(event)
}
