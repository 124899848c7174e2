use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;

/// Realm advertised to operators when basic auth fails
pub const BASIC_AUTH_REALM: &str = r#"Basic realm="Who are you?""#;

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

/// Application errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Payload could not be turned into candidate errors
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The store could not complete a query or commit a transaction
    #[error("Persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Stored state breaks a grouping invariant (e.g. two groups share a hash)
    #[error("Integrity violation: {0}")]
    Integrity(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn error_type(&self) -> &'static str {
        match self {
            AppError::MalformedInput(_) => "MalformedInput",
            AppError::Persistence(_) => "PersistenceFailure",
            AppError::Integrity(_) => "IntegrityViolation",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::NotFound(_) => "NotFound",
            AppError::Internal(_) => "InternalError",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        }

        let response = ErrorResponse {
            error: ErrorDetail {
                error_type: self.error_type().to_string(),
                message: self.to_string(),
            },
        };

        let mut builder = HttpResponse::build(status);
        if let AppError::Unauthorized(_) = self {
            builder.insert_header(("WWW-Authenticate", BASIC_AUTH_REALM));
        }
        builder.json(response)
    }
}

/// Result type alias for handlers and services
pub type AppResult<T> = Result<T, AppError>;
