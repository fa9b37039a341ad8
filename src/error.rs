// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::{AuthError, SignatureError};
use crate::database::manager::DatabaseError;

/// Message for every authentication failure
pub const UNAUTHORIZED: &str = "Unauthorized";
/// Message for every signature failure
pub const INVALID_REQUEST: &str = "Invalid request";

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized() -> Self {
        ApiError::Unauthorized(UNAUTHORIZED.to_string())
    }

    pub fn invalid_signature() -> Self {
        ApiError::Unauthorized(INVALID_REQUEST.to_string())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
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

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::InvalidArgument(msg) => ApiError::bad_request(msg),
            err @ (DatabaseError::NotFound { .. }
            | DatabaseError::NotFoundCondition { .. }
            | DatabaseError::NotModified { .. }) => ApiError::not_found(err.to_string()),
            err @ DatabaseError::AlreadyExists { .. } => ApiError::conflict(err.to_string()),
            DatabaseError::ConnectionFailure { .. } | DatabaseError::ConfigMissing(_) => {
                tracing::error!("Database unavailable: {}", err);
                ApiError::internal_server_error("Database temporarily unavailable")
            }
            DatabaseError::Scan { .. } => {
                // Don't expose column/type detail to clients
                tracing::error!("Row decode error: {}", err);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        tracing::debug!(stage = %err.stage, reason = %err.reason, "authentication rejected");
        ApiError::unauthorized()
    }
}

impl From<SignatureError> for ApiError {
    fn from(err: SignatureError) -> Self {
        tracing::debug!(reason = %err, "signature rejected");
        ApiError::invalid_signature()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthStage;
    use crate::types::Operation;

    #[test]
    fn database_errors_map_to_status_codes() {
        let cases = [
            (DatabaseError::InvalidArgument("x".into()), StatusCode::BAD_REQUEST),
            (DatabaseError::NotFound { table: "users".into() }, StatusCode::NOT_FOUND),
            (
                DatabaseError::NotModified { operation: Operation::Update, table: "users".into() },
                StatusCode::NOT_FOUND,
            ),
            (DatabaseError::AlreadyExists { table: "users".into() }, StatusCode::CONFLICT),
            (
                DatabaseError::ConnectionFailure { attempts: 5, reason: "refused".into() },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (DatabaseError::Sqlx(sqlx::Error::RowNotFound), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn auth_failures_are_generic() {
        let err = ApiError::from(AuthError {
            stage: AuthStage::TokenResolved,
            reason: "user 7 not found".into(),
        });
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_json()["message"], "Unauthorized");

        let err = ApiError::from(SignatureError::Stale { skew: 90 });
        assert_eq!(err.to_json()["message"], "Invalid request");
    }

    #[test]
    fn envelope_shape() {
        let body = ApiError::conflict("taken").to_json();
        assert_eq!(body, json!({"success": false, "message": "taken", "code": "CONFLICT"}));
    }
}
