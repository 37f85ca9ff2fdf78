//! Error taxonomy shared by every Docvault operation.
//!
//! Authorization failures carry user-safe messages. Store and storage
//! failures are wrapped so their internal text never reaches a caller.

use thiserror::Error;

use crate::storage::StorageError;
use crate::store::StoreError;

/// Convenience alias for domain operation results.
pub type VaultResult<T> = Result<T, VaultError>;

/// Domain errors.
#[derive(Debug, Error)]
pub enum VaultError {
    /// No credential, or an invalid/expired one.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Authenticated, but the role is insufficient.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Authenticated with the right role tier, but not the resource owner.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed input or a rejected operation.
    #[error("Invalid: {0}")]
    Invalid(String),

    #[error("Database error")]
    Database(#[source] sqlx::Error),

    #[error("Storage error")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VaultError {
    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::Unauthenticated => "unauthenticated",
            VaultError::Forbidden(_) => "forbidden",
            VaultError::AccessDenied(_) => "access_denied",
            VaultError::NotFound(_) => "not_found",
            VaultError::Conflict(_) => "conflict",
            VaultError::Invalid(_) => "invalid",
            VaultError::Database(_) | VaultError::Storage(_) | VaultError::Internal(_) => {
                "internal_error"
            }
        }
    }
}

impl From<StoreError> for VaultError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => VaultError::NotFound("Resource not found".into()),
            StoreError::Conflict(field) => VaultError::Conflict(format!("{field} already in use")),
            StoreError::IntegrityViolation(_) => {
                VaultError::Invalid("Operation would violate data integrity".into())
            }
            StoreError::Database(e) => VaultError::Database(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflict_names_field_only() {
        let err = VaultError::from(StoreError::Conflict("Email"));
        assert!(matches!(err, VaultError::Conflict(ref m) if m == "Email already in use"));
    }

    #[test]
    fn integrity_violation_text_is_not_leaked() {
        let err = VaultError::from(StoreError::IntegrityViolation(
            "insert on table \"api_keys\" violates foreign key".into(),
        ));
        match err {
            VaultError::Invalid(msg) => assert!(!msg.contains("api_keys")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn internal_kinds_share_one_code() {
        assert_eq!(VaultError::Internal("x".into()).code(), "internal_error");
        assert_eq!(VaultError::Unauthenticated.code(), "unauthenticated");
        assert_eq!(VaultError::Forbidden("x".into()).code(), "forbidden");
        assert_eq!(VaultError::AccessDenied("x".into()).code(), "access_denied");
    }
}
