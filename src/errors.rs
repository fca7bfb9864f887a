use sea_orm::error::DbErr;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Central error type for every service in the crate.
///
/// The posting layer guarantees that any error leaves persistent state
/// exactly as it was before the call: stock mutations and their ledger
/// entries share one transaction, and the transaction only commits when
/// every leg of an operation has succeeded.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The mutation would drive `available` below zero or `lock_quantity`
    /// above `quantity`. Recoverable: the caller may retry after stock
    /// arrives or cancel the owning order.
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    /// The workflow header's current status does not permit the requested
    /// transition. Not retryable.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The same (operation_type, business_no, business_line, key) tuple has
    /// already been posted. The stock store intercepts this internally and
    /// reports the posting as an already-applied success; it only escapes
    /// when something bypasses that path.
    #[error("Duplicate posting: {0}")]
    DuplicatePosting(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(Uuid),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    /// Shorthand used in `map_err` chains throughout the services.
    pub fn db_error(err: DbErr) -> Self {
        ServiceError::DatabaseError(err)
    }

    /// Whether a caller may reasonably retry the failed call as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::DatabaseError(_) | ServiceError::ConcurrentModification(_)
        )
    }

    /// Stable machine-readable code, used in logs and event payloads.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InsufficientStock(_) => "insufficient_stock",
            ServiceError::InvalidTransition(_) => "invalid_transition",
            ServiceError::DuplicatePosting(_) => "duplicate_posting",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::DatabaseError(_) => "database_error",
            ServiceError::ValidationError(_) => "validation_error",
            ServiceError::ConcurrentModification(_) => "concurrent_modification",
            ServiceError::EventError(_) => "event_error",
            ServiceError::InternalError(_) => "internal_error",
            ServiceError::Other(_) => "other",
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<sea_orm::TransactionError<ServiceError>> for ServiceError {
    fn from(err: sea_orm::TransactionError<ServiceError>) -> Self {
        match err {
            sea_orm::TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            sea_orm::TransactionError::Transaction(service_err) => service_err,
        }
    }
}

/// Serializable error view for event payloads and external reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl From<&ServiceError> for ErrorDetail {
    fn from(err: &ServiceError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ServiceError::DatabaseError(DbErr::Custom("gone".into())).is_retryable());
        assert!(!ServiceError::InsufficientStock("short".into()).is_retryable());
        assert!(!ServiceError::InvalidTransition("no".into()).is_retryable());
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            ServiceError::InsufficientStock("x".into()).code(),
            "insufficient_stock"
        );
        assert_eq!(
            ServiceError::DuplicatePosting("x".into()).code(),
            "duplicate_posting"
        );
    }
}
