use crate::error::AppResult;
use crate::ingest::notification::{Notification, NotificationEvent, NotificationException};
use crate::ingest::stacktrace::normalize_trace;
use crate::models::{CandidateError, EventData, NewErrorGroup, NewEvent};
use crate::services::grouping::{calculate_grouping_hash, compute_location};

/// Flattens a notification into one candidate error per exception.
///
/// Candidates come out in payload order (event by event, exception by
/// exception). The first malformed frame aborts the whole decode.
pub fn decode(notification: &Notification) -> AppResult<Vec<CandidateError>> {
    let mut candidates = Vec::new();

    for event in &notification.events {
        for exception in &event.exceptions {
            candidates.push(decode_exception(event, exception)?);
        }
    }

    Ok(candidates)
}

fn decode_exception(
    event: &NotificationEvent,
    exception: &NotificationException,
) -> AppResult<CandidateError> {
    let stack_trace = normalize_trace(&exception.stacktrace)?;

    let location = compute_location(&stack_trace);
    let grouping_hash = calculate_grouping_hash(
        &exception.error_class,
        &location,
        &event.severity,
        event.grouping_hash.as_deref(),
    );

    Ok(CandidateError {
        group: NewErrorGroup {
            grouping_hash,
            error_class: exception.error_class.clone(),
            location,
            severity: event.severity.clone(),
        },
        event: NewEvent {
            hostname: event.device.hostname.clone(),
            message: exception.message.clone(),
            data: EventData {
                stack_trace,
                metadata: event.metadata.clone(),
            },
        },
    })
}
