use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::basic::{keys_match, parse_basic_auth_header};
use crate::config::Config;
use crate::error::AppError;

/// Extractor for operator endpoints (HTTP basic auth).
///
/// Both the user name and the password must equal the configured API key.
///
/// Usage in handlers:
/// ```ignore
/// async fn my_handler(_auth: OperatorAuth) -> HttpResponse {
///     // only reached with valid credentials
/// }
/// ```
pub struct OperatorAuth;

impl FromRequest for OperatorAuth {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate_operator(req))
    }
}

fn authenticate_operator(req: &HttpRequest) -> Result<OperatorAuth, AppError> {
    let config = req
        .app_data::<web::Data<Config>>()
        .ok_or_else(|| AppError::Internal("Configuration not registered".to_string()))?;

    let (user, pass) = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(parse_basic_auth_header)
        .ok_or_else(|| AppError::Unauthorized("Missing basic auth credentials".to_string()))?;

    // Evaluate both comparisons so timing does not reveal which one failed
    let user_ok = keys_match(&user, &config.api_key);
    let pass_ok = keys_match(&pass, &config.api_key);
    if !(user_ok & pass_ok) {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    Ok(OperatorAuth)
}
