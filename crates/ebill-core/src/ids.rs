//! Identifier types for ebill.
//!
//! Every row in the store is keyed by a database-assigned integer. These newtypes keep
//! user, plan and event keys from being mixed up at call sites.
//!
//! # Macro-based ID Types
//!
//! The `int_id_type!` macro generates the newtype together with parsing, display and
//! serde support, so all three identifier kinds behave identically.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Macro to define an integer identifier type with standard trait implementations.
///
/// This macro generates a newtype wrapper around `i64` with implementations for:
/// - `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `Serialize`, `Deserialize` (transparent)
/// - `FromStr`, `Display`, `Debug`
/// - `From<i64>`, `From<$name> for i64`
macro_rules! int_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw row identifier.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the raw row identifier.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|_| IdError::InvalidInteger(s.to_string()))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

int_id_type!(UserId, "A user identifier.\n\nIdentifier `1` is reserved for the bootstrap identity.");
int_id_type!(PlanId, "A plan identifier.\n\nStored as `0` on a user row when no plan is assigned.");
int_id_type!(EventId, "A balance event identifier, increasing in insertion order.");

/// The reserved identifier of the bootstrap (root) identity.
pub const BOOTSTRAP_USER_ID: UserId = UserId::new(1);

impl UserId {
    /// Whether this is the reserved bootstrap identity.
    #[must_use]
    pub const fn is_bootstrap(self) -> bool {
        self.0 == BOOTSTRAP_USER_ID.0
    }
}

impl PlanId {
    /// Decode the stored plan column, where `0` means "no plan".
    #[must_use]
    pub const fn from_column(raw: i64) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Encode an optional plan reference into the stored column value.
    #[must_use]
    pub const fn to_column(plan: Option<Self>) -> i64 {
        match plan {
            Some(id) => id.0,
            None => 0,
        }
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not a decimal integer.
    #[error("invalid identifier: {0}")]
    InvalidInteger(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_parse_and_display() {
        let id: UserId = "42".parse().unwrap();
        assert_eq!(id, UserId::new(42));
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{id:?}"), "UserId(42)");
    }

    #[test]
    fn user_id_rejects_garbage() {
        assert!(matches!(
            "abc".parse::<UserId>(),
            Err(IdError::InvalidInteger(_))
        ));
    }

    #[test]
    fn bootstrap_id_is_reserved() {
        assert!(BOOTSTRAP_USER_ID.is_bootstrap());
        assert!(!UserId::new(2).is_bootstrap());
    }

    #[test]
    fn plan_column_zero_means_none() {
        assert_eq!(PlanId::from_column(0), None);
        assert_eq!(PlanId::from_column(7), Some(PlanId::new(7)));
        assert_eq!(PlanId::to_column(None), 0);
        assert_eq!(PlanId::to_column(Some(PlanId::new(7))), 7);
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&EventId::new(9)).unwrap();
        assert_eq!(json, "9");
        let parsed: EventId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, EventId::new(9));
    }
}
