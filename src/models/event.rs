use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use sqlx::FromRow;

use crate::error::{AppError, AppResult};

/// Event model - one reported exception occurrence, owned by an error group
#[derive(Debug, Clone, FromRow)]
pub struct Event {
    pub id: i64,
    pub error_id: i64,
    pub hostname: String,
    pub message: String,
    /// Encoded [`EventData`]; only decoded on read
    pub serialized_data: Vec<u8>,
    pub created_at: i64,
}

/// An event that has not been attached to a group yet
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub hostname: String,
    pub message: String,
    pub data: EventData,
}

/// Per-occurrence detail stored in the event blob
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventData {
    #[serde(rename = "stackTrace", default, skip_serializing_if = "Vec::is_empty")]
    pub stack_trace: Vec<StackFrame>,

    /// Passthrough metadata, kept as the exact JSON text the notifier sent
    #[serde(rename = "metaData", default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Box<RawValue>>,
}

/// One call site plus its reconstructed source context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    pub file: String,
    pub line_number: i64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code: Vec<LineOfCode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineOfCode {
    pub line_number: i64,
    pub content: String,
}

/// Response for API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stack_trace: Vec<StackFrame>,
    #[serde(rename = "metaData", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Box<RawValue>>,
    pub created_at: i64,
}

impl EventData {
    /// Encodes the event data for the storage blob
    pub fn encode(&self) -> AppResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| AppError::Internal(format!("Failed to encode event data: {}", e)))
    }

    /// Decodes event data from a storage blob
    pub fn decode(bytes: &[u8]) -> AppResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| AppError::Internal(format!("Stored event data is corrupt: {}", e)))
    }
}

impl Event {
    pub fn event_data(&self) -> AppResult<EventData> {
        EventData::decode(&self.serialized_data)
    }

    /// Converts to API response format, decoding the blob
    pub fn to_response(&self) -> AppResult<EventResponse> {
        let data = self.event_data()?;

        Ok(EventResponse {
            hostname: self.hostname.clone(),
            message: self.message.clone(),
            stack_trace: data.stack_trace,
            metadata: data.metadata,
            created_at: self.created_at,
        })
    }
}
