//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use docvault_core::VaultError;
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthenticated", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::AccessDenied(m) => (StatusCode::FORBIDDEN, "access_denied", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "invalid", m.as_str()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error",
            ),
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<VaultError> for AppError {
    fn from(e: VaultError) -> Self {
        match e {
            VaultError::Unauthenticated => AppError::Unauthorized("Authentication required".into()),
            VaultError::Forbidden(m) => AppError::Forbidden(m),
            VaultError::AccessDenied(m) => AppError::AccessDenied(m),
            VaultError::NotFound(m) => AppError::NotFound(m),
            VaultError::Conflict(m) => AppError::Conflict(m),
            VaultError::Invalid(m) => AppError::Validation(m),
            VaultError::Database(ref source) => {
                error!(error = %source, "database error");
                AppError::Internal(e.to_string())
            }
            VaultError::Storage(ref source) => {
                error!(error = %source, "object storage error");
                AppError::Internal(e.to_string())
            }
            VaultError::Internal(m) => {
                error!(error = %m, "internal error");
                AppError::Internal(m)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vault_kinds_map_to_statuses() {
        let cases = [
            (VaultError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (VaultError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (VaultError::AccessDenied("x".into()), StatusCode::FORBIDDEN),
            (VaultError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (VaultError::Conflict("x".into()), StatusCode::CONFLICT),
            (VaultError::Invalid("x".into()), StatusCode::BAD_REQUEST),
            (VaultError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
