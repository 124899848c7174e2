use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::value::RawValue;

use crate::error::{AppError, AppResult};

/// One inbound payload from a notifier library.
///
/// Every field is optional on the wire, and an explicit `null` reads the same
/// as an absent field.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Notification {
    #[serde(deserialize_with = "null_as_default")]
    pub api_key: String,
    #[serde(deserialize_with = "null_as_default")]
    pub notifier: NotifierInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub events: Vec<NotificationEvent>,
}

/// Notifier library information
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NotifierInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
}

/// One event: a batch of exceptions sharing device, severity and metadata
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationEvent {
    #[serde(deserialize_with = "null_as_default")]
    pub app: AppInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub payload_version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub exceptions: Vec<NotificationException>,
    #[serde(deserialize_with = "null_as_default")]
    pub severity: String,
    #[serde(deserialize_with = "null_as_default")]
    pub device: DeviceInfo,
    /// Caller-supplied grouping identity, overrides the computed one when non-empty
    pub grouping_hash: Option<String>,
    #[serde(rename = "metaData")]
    pub metadata: Option<Box<RawValue>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(deserialize_with = "null_as_default")]
    pub release_stage: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub app_type: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub hostname: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationException {
    #[serde(deserialize_with = "null_as_default")]
    pub error_class: String,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
    /// Frames as sent, innermost first
    #[serde(deserialize_with = "null_as_default")]
    pub stacktrace: Vec<NotificationFrame>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationFrame {
    #[serde(deserialize_with = "null_as_default")]
    pub line_number: i64,
    /// Sparse source context keyed by line number as a string
    #[serde(deserialize_with = "null_source_lines_as_empty")]
    pub code: HashMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    pub file: String,
    #[serde(deserialize_with = "null_as_default")]
    pub method: String,
}

impl Notification {
    /// Parses a notification from raw request bytes
    pub fn from_slice(bytes: &[u8]) -> AppResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| AppError::MalformedInput(format!("Invalid notification JSON: {}", e)))
    }
}

/// Treats an explicit JSON `null` like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Like [`null_as_default`], and a `null` source line reads as an empty line
fn null_source_lines_as_empty<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let lines = Option::<HashMap<String, Option<String>>>::deserialize(deserializer)?;
    Ok(lines
        .unwrap_or_default()
        .into_iter()
        .map(|(number, content)| (number, content.unwrap_or_default()))
        .collect())
}
