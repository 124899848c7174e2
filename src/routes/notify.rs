use actix_web::{web, HttpRequest, HttpResponse};
use bytes::Bytes;

use crate::auth::keys_match;
use crate::config::Config;
use crate::db::DbPool;
use crate::digest::{process_notification, MergeOutcome};
use crate::error::{AppError, AppResult};
use crate::ingest::Notification;
use crate::store::PgErrorStore;

/// Header newer notifier libraries use instead of the `apiKey` body field
pub const API_KEY_HEADER: &str = "Bugsnag-Api-Key";

/// Response for a merged notification
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyResponse {
    /// Number of exceptions stored
    pub received: usize,
    /// How many of them started a new error group
    pub new_groups: usize,
}

/// POST /
/// Receives one notification from a notifier library
pub async fn receive(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    req: HttpRequest,
    body: Bytes,
) -> AppResult<HttpResponse> {
    let notification = Notification::from_slice(&body)?;

    // The body field wins; the header is only consulted when it is absent
    let presented_key = if notification.api_key.is_empty() {
        req.headers()
            .get(API_KEY_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string()
    } else {
        notification.api_key.clone()
    };

    if !keys_match(&presented_key, &config.api_key) {
        log::warn!(
            "Notification from {} rejected: API key not recognized",
            req.connection_info().realip_remote_addr().unwrap_or("unknown")
        );
        return Err(AppError::Unauthorized("API key not recognized".to_string()));
    }

    let store = PgErrorStore::new(pool.get_ref().clone());
    let outcomes = process_notification(&store, &notification).await?;

    let new_groups = outcomes
        .iter()
        .filter(|o| matches!(o, MergeOutcome::Created { .. }))
        .count();

    Ok(HttpResponse::Ok().json(NotifyResponse {
        received: outcomes.len(),
        new_groups,
    }))
}

/// Configures the notification route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::post().to(receive));
}
