// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// HTTP API error with stable client-facing codes. Authorization failures map
/// to 403 FORBIDDEN (or FROZEN for disabled accounts); illegal transitions get
/// their own codes so a client can tell "you can't do this to anyone" from
/// "this item already moved on".
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    InvalidBody(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),
    Frozen(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),
    AlreadyReviewed(String),
    AlreadyArchived(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidBody(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::Frozen(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::AlreadyReviewed(_) => 409,
            ApiError::AlreadyArchived(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::InvalidBody(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::Frozen(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::AlreadyReviewed(msg) => msg,
            ApiError::AlreadyArchived(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidBody(_) => "INVALID_BODY",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Frozen(_) => "FROZEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::AlreadyReviewed(_) => "ALREADY_REVIEWED",
            ApiError::AlreadyArchived(_) => "ALREADY_ARCHIVED",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn invalid_body(message: impl Into<String>) -> Self {
        ApiError::InvalidBody(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn frozen(message: impl Into<String>) -> Self {
        ApiError::Frozen(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert domain error types to ApiError
impl From<crate::store::StoreError> for ApiError {
    fn from(err: crate::store::StoreError) -> Self {
        match err {
            crate::store::StoreError::NotFound(msg) => ApiError::not_found(msg),
            crate::store::StoreError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Store query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            crate::store::StoreError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<crate::scope::ScopeError> for ApiError {
    fn from(err: crate::scope::ScopeError) -> Self {
        match err {
            crate::scope::ScopeError::DepthCapExceeded(cap) => {
                tracing::error!("Scope resolution aborted: depth cap {} exceeded", cap);
                ApiError::internal_server_error("Organization tree could not be resolved")
            }
            crate::scope::ScopeError::Store(e) => e.into(),
        }
    }
}

impl From<crate::workflow::engine::WorkflowError> for ApiError {
    fn from(err: crate::workflow::engine::WorkflowError) -> Self {
        use crate::workflow::engine::WorkflowError;
        match err {
            WorkflowError::Forbidden(msg) => ApiError::forbidden(msg),
            WorkflowError::NotFound(msg) => ApiError::not_found(msg),
            WorkflowError::AlreadyReviewed => {
                ApiError::AlreadyReviewed("Resource was already reviewed".to_string())
            }
            WorkflowError::AlreadyArchived => {
                ApiError::AlreadyArchived("Resource was already archived".to_string())
            }
            WorkflowError::IllegalTransition { from, action } => ApiError::conflict(format!(
                "Cannot {} a resource in status '{}'",
                action, from
            )),
            WorkflowError::PrerequisiteBlocked(msg) => ApiError::conflict(msg),
            WorkflowError::Scope(e) => e.into(),
            WorkflowError::Store(e) => e.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
