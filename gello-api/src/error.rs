/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`; errors from the shared crate
/// convert with `?`.
///
/// Every error body has the same shape:
///
/// ```json
/// { "error": "not_found", "message": "Task not found" }
/// ```
///
/// Validation failures add `details`, one entry per failing field.
///
/// # Example
///
/// ```
/// use gello_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler(found: bool) -> ApiResult<Json<serde_json::Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Board not found".to_string()));
///     }
///     Ok(Json(json!({ "ok": true })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gello_shared::auth::csrf::CsrfError;
use gello_shared::auth::jwt::JwtError;
use gello_shared::auth::permissions::AuthzError;
use gello_shared::auth::provider::AuthProviderError;
use gello_shared::db::store::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// CSRF check failed (403)
    CsrfFailed(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - e.g., duplicate email
    Conflict(String),

    /// Bad request (400) - per-field validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Bad request (400) - balance too low for a debit
    InsufficientPoints { available: i64, required: i64 },

    /// Internal server error (500)
    InternalError(String),

    /// Bad gateway (502) - auth service failing
    BadGateway(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Single-field validation failure
    pub fn invalid_field(field: &str, message: &str) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(field, message)])
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::CsrfFailed(msg) => write!(f, "CSRF check failed: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InsufficientPoints { available, required } => write!(
                f,
                "Insufficient points: {} available, {} required",
                available, required
            ),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::BadGateway(msg) => write!(f, "Bad gateway: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::CsrfFailed(msg) => (StatusCode::FORBIDDEN, "csrf_failed", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InsufficientPoints { available, required } => (
                StatusCode::BAD_REQUEST,
                "insufficient_points",
                format!(
                    "Insufficient points: {} available, {} required",
                    available, required
                ),
                None,
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::BadGateway(msg) => {
                tracing::error!("Auth service error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "bad_gateway",
                    "The authentication service is unavailable".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert store errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            StoreError::Conflict(_) => ApiError::Conflict("Resource already exists".to_string()),
            StoreError::InvalidReference(_) => {
                ApiError::BadRequest("Referenced resource does not exist".to_string())
            }
            StoreError::TaskCompleted => ApiError::BadRequest(
                "A completed task keeps its story points and assignee".to_string(),
            ),
            StoreError::Database(err) => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            // hidden rows look the same as missing ones
            AuthzError::NotTeamMember(_) => ApiError::NotFound("Resource not found".to_string()),
            AuthzError::Unassigned => ApiError::BadRequest(err.to_string()),
            AuthzError::InsufficientRole { .. } => {
                ApiError::Forbidden("Insufficient permissions".to_string())
            }
            AuthzError::NotAssignee | AuthzError::NotAuthorized => {
                ApiError::Forbidden(err.to_string())
            }
        }
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidAudience { .. } => {
                ApiError::Unauthorized("Invalid token audience".to_string())
            }
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

/// Convert CSRF errors to API errors
impl From<CsrfError> for ApiError {
    fn from(err: CsrfError) -> Self {
        ApiError::CsrfFailed(err.to_string())
    }
}

/// Convert auth provider errors to API errors
impl From<AuthProviderError> for ApiError {
    fn from(err: AuthProviderError) -> Self {
        match err {
            AuthProviderError::InvalidCredentials | AuthProviderError::InvalidRefreshToken => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthProviderError::DuplicateUser => ApiError::Conflict(err.to_string()),
            AuthProviderError::UserNotFound => ApiError::NotFound(err.to_string()),
            AuthProviderError::Rejected(msg) => ApiError::BadRequest(msg),
            AuthProviderError::Upstream(msg) => ApiError::BadGateway(msg),
        }
    }
}

/// Convert derive-validation failures to API errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        // field_errors() is a HashMap; keep responses stable
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(errors)
    }
}
