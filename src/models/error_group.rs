use serde::Serialize;
use sqlx::FromRow;

use crate::models::{EventResponse, NewEvent};

/// Error group model - a deduplicated class of occurrences sharing one grouping hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ErrorGroup {
    pub id: i64,
    /// Internal identity key, never sent to clients
    #[serde(skip_serializing)]
    pub grouping_hash: String,
    pub error_class: String,
    pub location: String,
    pub severity: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Identity and descriptive fields of a group that may not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewErrorGroup {
    pub grouping_hash: String,
    pub error_class: String,
    pub location: String,
    pub severity: String,
}

/// A decoded occurrence: the group it claims plus exactly one event
#[derive(Debug, Clone)]
pub struct CandidateError {
    pub group: NewErrorGroup,
    pub event: NewEvent,
}

/// Response for API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorGroupResponse {
    pub id: i64,
    pub error_class: String,
    pub location: String,
    pub severity: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub events: Vec<EventResponse>,
}

impl ErrorGroup {
    /// Converts to API response format with the given (already decoded) events
    pub fn to_response(&self, events: Vec<EventResponse>) -> ErrorGroupResponse {
        ErrorGroupResponse {
            id: self.id,
            error_class: self.error_class.clone(),
            location: self.location.clone(),
            severity: self.severity.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            events,
        }
    }
}
