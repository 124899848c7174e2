use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::auth::OperatorAuth;
use crate::config::Config;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::ErrorGroupResponse;
use crate::services::ErrorGroupService;

/// Listing returned to the dashboard
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListErrorsResponse {
    /// Echoed so the dashboard can show notifier setup instructions
    pub api_key: String,
    pub errors: Vec<ErrorGroupResponse>,
}

/// GET /errors
/// Lists all error groups with their events
pub async fn list_errors(
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    _auth: OperatorAuth,
) -> AppResult<HttpResponse> {
    let errors = ErrorGroupService::list_with_events(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(ListErrorsResponse {
        api_key: config.api_key.clone(),
        errors,
    }))
}

/// GET /errors/{id}
/// Gets a single error group with its events
pub async fn get_error(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    _auth: OperatorAuth,
) -> AppResult<HttpResponse> {
    let group = ErrorGroupService::get_with_events(pool.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(group))
}

/// DELETE /errors/{id}
/// Deletes an error group and its events
pub async fn delete_error(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    _auth: OperatorAuth,
) -> AppResult<HttpResponse> {
    ErrorGroupService::delete(pool.get_ref(), path.into_inner()).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// Configure error group routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/errors")
            .route("", web::get().to(list_errors))
            .route("/{id}", web::get().to(get_error))
            .route("/{id}", web::delete().to(delete_error)),
    );
}
