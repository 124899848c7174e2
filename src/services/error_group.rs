use std::collections::HashMap;

use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{ErrorGroup, ErrorGroupResponse, Event};

pub struct ErrorGroupService;

impl ErrorGroupService {
    /// Lists every group with its events.
    ///
    /// Groups are ordered by most recent activity, events newest first.
    pub async fn list_with_events(pool: &PgPool) -> AppResult<Vec<ErrorGroupResponse>> {
        let groups = sqlx::query_as::<_, ErrorGroup>(
            "SELECT * FROM errors ORDER BY updated_at DESC, id DESC",
        )
        .fetch_all(pool)
        .await?;

        if groups.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = groups.iter().map(|g| g.id).collect();
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT * FROM events
            WHERE error_id = ANY($1)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(&ids)
        .fetch_all(pool)
        .await?;

        let mut by_group: HashMap<i64, Vec<Event>> = HashMap::new();
        for event in events {
            by_group.entry(event.error_id).or_default().push(event);
        }

        groups
            .iter()
            .map(|group| {
                let events = by_group
                    .remove(&group.id)
                    .unwrap_or_default()
                    .iter()
                    .map(Event::to_response)
                    .collect::<AppResult<Vec<_>>>()?;
                Ok(group.to_response(events))
            })
            .collect()
    }

    /// Gets a group by ID
    pub async fn get_by_id(pool: &PgPool, id: i64) -> AppResult<ErrorGroup> {
        let group = sqlx::query_as::<_, ErrorGroup>("SELECT * FROM errors WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Error group {} not found", id)))?;

        Ok(group)
    }

    /// Gets a group by ID together with its events, newest first
    pub async fn get_with_events(pool: &PgPool, id: i64) -> AppResult<ErrorGroupResponse> {
        let group = Self::get_by_id(pool, id).await?;

        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE error_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(group.id)
        .fetch_all(pool)
        .await?
        .iter()
        .map(Event::to_response)
        .collect::<AppResult<Vec<_>>>()?;

        Ok(group.to_response(events))
    }

    /// Deletes a group; its events go with it
    pub async fn delete(pool: &PgPool, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM errors WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Error group {} not found", id)));
        }

        log::info!("Deleted error group {}", id);
        Ok(())
    }
}
