//! Integration tests for the PostgreSQL store
//!
//! Tests uniqueness, transaction visibility and rollback against a real database.

use snagtrak::error::AppError;
use snagtrak::models::{EventData, NewErrorGroup, NewEvent};
use snagtrak::store::{CreateOutcome, ErrorStore, PgErrorStore};

use crate::common::TestDb;

fn group(hash: &str) -> NewErrorGroup {
    NewErrorGroup {
        grouping_hash: hash.to_string(),
        error_class: "RuntimeError".to_string(),
        location: "app.rb:3".to_string(),
        severity: "error".to_string(),
    }
}

fn event(message: &str) -> NewEvent {
    NewEvent {
        hostname: "web-1".to_string(),
        message: message.to_string(),
        data: EventData::default(),
    }
}

async fn create(store: &PgErrorStore, hash: &str, now: i64) -> i64 {
    match store
        .create_group_with_event(&group(hash), &event("first"), now)
        .await
        .expect("Failed to create group")
    {
        CreateOutcome::Created { group, event } => {
            assert_eq!(event.error_id, group.id);
            group.id
        }
        CreateOutcome::Conflict => panic!("unexpected conflict for {}", hash),
    }
}

#[tokio::test]
async fn test_create_stamps_both_timestamps() {
    let db = TestDb::new().await;
    let store = PgErrorStore::new(db.pool.clone());

    create(&store, "h1", 1_000).await;

    let groups = store.find_groups_by_hash("h1").await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].created_at, 1_000);
    assert_eq!(groups[0].updated_at, 1_000);
}

#[tokio::test]
async fn test_second_create_for_same_hash_conflicts() {
    let db = TestDb::new().await;
    let store = PgErrorStore::new(db.pool.clone());

    create(&store, "h1", 1_000).await;
    let second = store
        .create_group_with_event(&group("h1"), &event("second"), 1_001)
        .await
        .unwrap();

    assert!(matches!(second, CreateOutcome::Conflict));
    assert_eq!(db.group_count().await, 1);
    assert_eq!(db.event_count().await, 1);
}

#[tokio::test]
async fn test_unique_constraint_rejects_raw_duplicates() {
    let db = TestDb::new().await;

    let insert = "INSERT INTO errors (grouping_hash, error_class, location, severity, created_at, updated_at) \
                  VALUES ('dup', 'E', 'unknown location', 'error', 1, 1)";
    sqlx::query(insert).execute(&db.pool).await.unwrap();
    let result = sqlx::query(insert).execute(&db.pool).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_committed_append_is_visible() {
    let db = TestDb::new().await;
    let store = PgErrorStore::new(db.pool.clone());
    let id = create(&store, "h1", 1_000).await;

    let mut tx = store.begin().await.unwrap();
    tx.append_event_to_group(id, &event("second"), 2_000)
        .await
        .unwrap();
    tx.touch_group_updated_at(id, 2_000).await.unwrap();

    // Not visible outside the transaction yet
    assert_eq!(db.event_count().await, 1);

    tx.commit().await.unwrap();

    let events = store.events_for_group(id).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].message, "second");
    assert_eq!(
        store.find_groups_by_hash("h1").await.unwrap()[0].updated_at,
        2_000
    );
}

#[tokio::test]
async fn test_touch_never_moves_backwards() {
    let db = TestDb::new().await;
    let store = PgErrorStore::new(db.pool.clone());
    let id = create(&store, "h1", 5_000).await;

    let mut tx = store.begin().await.unwrap();
    tx.touch_group_updated_at(id, 4_000).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(
        store.find_groups_by_hash("h1").await.unwrap()[0].updated_at,
        5_000
    );
}

#[tokio::test]
async fn test_failed_touch_rolls_back_the_append() {
    let db = TestDb::new().await;
    let store = PgErrorStore::new(db.pool.clone());
    let id = create(&store, "h1", 1_000).await;

    let mut tx = store.begin().await.unwrap();
    tx.append_event_to_group(id, &event("second"), 2_000)
        .await
        .unwrap();
    let result = tx.touch_group_updated_at(id + 1_000, 2_000).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    tx.rollback().await.unwrap();

    assert_eq!(db.group_count().await, 1);
    assert_eq!(db.event_count().await, 1);
    assert_eq!(
        store.find_groups_by_hash("h1").await.unwrap()[0].updated_at,
        1_000
    );
}

#[tokio::test]
async fn test_append_to_missing_group_is_a_persistence_failure() {
    let db = TestDb::new().await;
    let store = PgErrorStore::new(db.pool.clone());

    let mut tx = store.begin().await.unwrap();
    let result = tx.append_event_to_group(42, &event("orphan"), 1_000).await;

    assert!(matches!(result, Err(AppError::Persistence(_))));
    tx.rollback().await.unwrap();
    assert_eq!(db.event_count().await, 0);
}

#[tokio::test]
async fn test_events_are_newest_first() {
    let db = TestDb::new().await;
    let store = PgErrorStore::new(db.pool.clone());
    let id = create(&store, "h1", 1_000).await;

    for (message, now) in [("b", 3_000), ("c", 2_000)] {
        let mut tx = store.begin().await.unwrap();
        tx.append_event_to_group(id, &event(message), now)
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    let messages: Vec<String> = store
        .events_for_group(id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.message)
        .collect();
    assert_eq!(messages, vec!["b", "c", "first"]);
}
