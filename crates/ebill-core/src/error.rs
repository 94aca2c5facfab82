//! Error types for ebill.

use crate::capability::CapabilityError;
use crate::money::MoneyError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, BillingError>;

/// Errors that can occur in ledger operations.
///
/// Permission and validation failures are raised before any write; `Persistence` means the
/// store failed and any transaction in flight was rolled back.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// The committer lacks the capability the operation requires.
    #[error("permission denied: {reason}")]
    PermissionDenied {
        /// What was missing.
        reason: String,
    },

    /// A name, email, or plan lookup found nothing.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of record looked up.
        entity: &'static str,
        /// The key that missed.
        key: String,
    },

    /// An input failed its validation pattern.
    #[error("invalid {field} format: {value:?}")]
    InvalidFormat {
        /// Which input was rejected.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The session token is unknown.
    #[error("invalid token")]
    InvalidToken,

    /// No unused session token could be generated within the retry bound.
    #[error("token generation exhausted after {attempts} attempts")]
    TokenExhausted {
        /// Attempts made.
        attempts: u32,
    },

    /// The underlying store failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl BillingError {
    /// Shorthand for [`BillingError::PermissionDenied`].
    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`BillingError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Shorthand for [`BillingError::InvalidFormat`].
    #[must_use]
    pub fn invalid_format(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidFormat {
            field,
            value: value.into(),
        }
    }
}

impl From<MoneyError> for BillingError {
    fn from(err: MoneyError) -> Self {
        match err {
            MoneyError::InvalidFormat(value) => Self::invalid_format("amount", value),
        }
    }
}

impl From<CapabilityError> for BillingError {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::Unknown(value) => Self::invalid_format("permission", value),
        }
    }
}
