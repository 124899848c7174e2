//! Unit tests for the merge engine
//!
//! Runs the lookup-or-create logic against the in-memory store.

use std::collections::HashSet;

use snagtrak::digest::{process_error, process_notification, MergeOutcome};
use snagtrak::error::AppError;
use snagtrak::ingest::{decode, Notification};
use snagtrak::models::CandidateError;
use snagtrak::store::{ErrorStore, MemoryErrorStore};

use crate::common::fixtures::events;
use crate::common::{notification, EventBuilder, TEST_API_KEY};

fn candidate(event: serde_json::Value) -> CandidateError {
    let body = serde_json::to_vec(&notification(TEST_API_KEY, vec![event])).unwrap();
    let notification = Notification::from_slice(&body).unwrap();
    decode(&notification).unwrap().remove(0)
}

// =============================================================================
// First and Repeated Occurrences
// =============================================================================

#[tokio::test]
async fn test_first_occurrence_creates_group() {
    let store = MemoryErrorStore::new();

    let outcome = process_error(&store, &candidate(events::null_pointer()))
        .await
        .unwrap();

    assert!(matches!(outcome, MergeOutcome::Created { .. }));
    let groups = store.groups().await;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].created_at, groups[0].updated_at);
    assert_eq!(groups[0].error_class, "NullPointer");
    assert_eq!(groups[0].location, "a.go:10");
    assert_eq!(
        store.events_for_group(groups[0].id).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_repeat_occurrence_appends_to_group() {
    let store = MemoryErrorStore::new();

    let first = process_error(&store, &candidate(events::null_pointer()))
        .await
        .unwrap();
    let second = process_error(&store, &candidate(events::null_pointer()))
        .await
        .unwrap();

    assert!(matches!(second, MergeOutcome::Appended { .. }));
    assert_eq!(first.group_id(), second.group_id());

    let groups = store.groups().await;
    assert_eq!(groups.len(), 1);
    assert!(groups[0].updated_at >= groups[0].created_at);
    assert_eq!(
        store.events_for_group(first.group_id()).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_different_severity_is_a_different_group() {
    let store = MemoryErrorStore::new();

    let error = process_error(
        &store,
        &candidate(EventBuilder::new().with_exception("E", "m").build()),
    )
    .await
    .unwrap();
    let warning = process_error(
        &store,
        &candidate(
            EventBuilder::new()
                .with_severity("warning")
                .with_exception("E", "m")
                .build(),
        ),
    )
    .await
    .unwrap();

    assert_ne!(error.group_id(), warning.group_id());
    assert_eq!(store.groups().await.len(), 2);
}

#[tokio::test]
async fn test_notification_outcomes_follow_payload_order() {
    let store = MemoryErrorStore::new();
    let body = notification(
        TEST_API_KEY,
        vec![
            EventBuilder::new()
                .with_exception("A", "1")
                .with_exception("B", "2")
                .build(),
            EventBuilder::new().with_exception("A", "3").build(),
        ],
    );
    let notification = Notification::from_slice(&serde_json::to_vec(&body).unwrap()).unwrap();

    let outcomes = process_notification(&store, &notification).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(outcomes[0], MergeOutcome::Created { .. }));
    assert!(matches!(outcomes[1], MergeOutcome::Created { .. }));
    assert!(matches!(outcomes[2], MergeOutcome::Appended { .. }));
    assert_eq!(outcomes[0].group_id(), outcomes[2].group_id());
}

// =============================================================================
// Failure Handling
// =============================================================================

#[tokio::test]
async fn test_failed_touch_rolls_back_the_append() {
    let store = MemoryErrorStore::new();
    let first = process_error(&store, &candidate(events::null_pointer()))
        .await
        .unwrap();
    let before = store.groups().await;

    store.fail_next_touch();
    let result = process_error(&store, &candidate(events::null_pointer())).await;

    assert!(result.is_err());
    assert_eq!(store.groups().await, before);
    assert_eq!(
        store.events_for_group(first.group_id()).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_duplicate_groups_are_an_integrity_violation() {
    let store = MemoryErrorStore::new();
    let candidate = candidate(events::null_pointer());
    store.insert_raw_group(&candidate.group, 100).await;
    store.insert_raw_group(&candidate.group, 100).await;

    let result = process_error(&store, &candidate).await;

    assert!(matches!(result, Err(AppError::Integrity(_))));
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_occurrences_create_one_group() {
    let store = MemoryErrorStore::new();
    let candidate = candidate(events::null_pointer());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let store = store.clone();
            let candidate = candidate.clone();
            tokio::spawn(async move { process_error(&store, &candidate).await })
        })
        .collect();

    let mut group_ids = HashSet::new();
    let mut created = 0;
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        if matches!(outcome, MergeOutcome::Created { .. }) {
            created += 1;
        }
        group_ids.insert(outcome.group_id());
    }

    assert_eq!(created, 1);
    assert_eq!(group_ids.len(), 1);
    assert_eq!(store.groups().await.len(), 1);

    let group_id = group_ids.into_iter().next().unwrap();
    assert_eq!(store.events_for_group(group_id).await.unwrap().len(), 16);
}
