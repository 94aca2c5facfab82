//! Error types for ebill storage.

use ebill_core::{BillingError, UserId};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// A stored column could not be decoded into a domain value.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Key that missed.
        id: String,
    },

    /// A unique constraint rejected the write.
    #[error("duplicate {0}")]
    Duplicate(String),

    /// The plan is still referenced by a user.
    #[error("plan {plan} is still in use by {user}")]
    PlanInUse {
        /// Plan name.
        plan: String,
        /// First referencing user.
        user: String,
    },

    /// The bootstrap row did not receive the reserved identifier.
    #[error("bootstrap identity received id {got}, expected {expected}")]
    BootstrapMismatch {
        /// Identifier assigned by the database.
        got: UserId,
        /// The reserved identifier.
        expected: UserId,
    },

    /// Arithmetic on a stored amount overflowed.
    #[error("amount overflow on {0}")]
    Overflow(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Self::Duplicate(db_err.message().to_string())
            }
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<StoreError> for BillingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, key: id },
            StoreError::Duplicate(_)
            | StoreError::PlanInUse { .. }
            | StoreError::BootstrapMismatch { .. }
            | StoreError::Overflow(_) => Self::Conflict(err.to_string()),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Persistence(msg),
        }
    }
}
