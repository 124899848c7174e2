use chrono::Utc;

use crate::error::{AppError, AppResult};
use crate::ingest::{decode, Notification};
use crate::models::{CandidateError, ErrorGroup, NewEvent};
use crate::store::{CreateOutcome, ErrorStore};

/// What happened to one candidate error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First occurrence of the grouping hash: a new group was created
    Created { group_id: i64, event_id: i64 },
    /// The occurrence was appended to an existing group
    Appended { group_id: i64, event_id: i64 },
}

impl MergeOutcome {
    pub fn group_id(&self) -> i64 {
        match self {
            MergeOutcome::Created { group_id, .. } | MergeOutcome::Appended { group_id, .. } => {
                *group_id
            }
        }
    }
}

/// Decodes a notification and merges every candidate, in payload order.
///
/// Stops at the first failure; candidates merged before it stay merged.
pub async fn process_notification<S>(
    store: &S,
    notification: &Notification,
) -> AppResult<Vec<MergeOutcome>>
where
    S: ErrorStore + ?Sized,
{
    let candidates = decode(notification)?;

    let mut outcomes = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        outcomes.push(process_error(store, candidate).await?);
    }

    Ok(outcomes)
}

/// Files one candidate error under its group, creating the group on first sight
pub async fn process_error<S>(store: &S, candidate: &CandidateError) -> AppResult<MergeOutcome>
where
    S: ErrorStore + ?Sized,
{
    let now = Utc::now().timestamp();
    let hash = &candidate.group.grouping_hash;

    let matches = store.find_groups_by_hash(hash).await?;

    let group = match single_match(matches, hash)? {
        Some(group) => group,
        None => {
            match store
                .create_group_with_event(&candidate.group, &candidate.event, now)
                .await?
            {
                CreateOutcome::Created { group, event } => {
                    log::info!(
                        "New error group {} ({} at {})",
                        group.id,
                        group.error_class,
                        group.location
                    );
                    return Ok(MergeOutcome::Created {
                        group_id: group.id,
                        event_id: event.id,
                    });
                }
                CreateOutcome::Conflict => {
                    // Lost the creation race; the winner's group now exists
                    log::warn!(
                        "Concurrent creation of error group for {}, appending instead",
                        candidate.group.error_class
                    );
                    let matches = store.find_groups_by_hash(hash).await?;
                    single_match(matches, hash)?.ok_or_else(|| {
                        AppError::Integrity(
                            "Error group vanished after a conflicting insert".to_string(),
                        )
                    })?
                }
            }
        }
    };

    let event_id = append_to_group(store, &group, &candidate.event, now).await?;

    log::debug!("Appended event {} to error group {}", event_id, group.id);

    Ok(MergeOutcome::Appended {
        group_id: group.id,
        event_id,
    })
}

/// Accepts zero or one group for a hash; more is an integrity violation
fn single_match(mut matches: Vec<ErrorGroup>, hash: &str) -> AppResult<Option<ErrorGroup>> {
    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        n => Err(AppError::Integrity(format!(
            "{} error groups share grouping hash {}",
            n, hash
        ))),
    }
}

/// Writes the event and refreshes the group's recency in one transaction
async fn append_to_group<S>(
    store: &S,
    group: &ErrorGroup,
    event: &NewEvent,
    now: i64,
) -> AppResult<i64>
where
    S: ErrorStore + ?Sized,
{
    let mut tx = store.begin().await?;

    let result = async {
        let stored = tx.append_event_to_group(group.id, event, now).await?;
        tx.touch_group_updated_at(group.id, now).await?;
        Ok::<_, AppError>(stored.id)
    }
    .await;

    match result {
        Ok(event_id) => {
            tx.commit().await?;
            Ok(event_id)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                log::error!(
                    "Rollback for error group {} failed: {}",
                    group.id,
                    rollback_err
                );
            }
            Err(e)
        }
    }
}
