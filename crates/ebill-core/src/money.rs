//! Fixed-point money.
//!
//! Amounts are stored as `i64` minor units (1/100 of the display unit) to avoid floating
//! point drift. The string form always carries exactly two fractional digits:
//!
//! - `Money::from_minor(1032)` encodes as `"10.32"`
//! - `Money::from_minor(-1)` encodes as `"-0.01"`
//!
//! Decoding is lenient and lossy: fractional digits past the second are dropped without
//! rounding, a missing fractional part means `.00`, and the empty string is zero.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of fractional digits in the canonical string form.
pub const FRACTION_DIGITS: usize = 2;

/// A money amount in minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create an amount from minor units.
    #[must_use]
    pub const fn from_minor(minor_units: i64) -> Self {
        Self(minor_units)
    }

    /// Return the amount in minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// Whether the amount is strictly positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Add two amounts, returning `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Encode into the canonical two-decimal string.
    #[must_use]
    pub fn encode(self) -> String {
        self.to_string()
    }

    /// Decode a decimal string.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::InvalidFormat` if the digits do not form an integer amount that
    /// fits in `i64` minor units.
    pub fn decode(input: &str) -> Result<Self, MoneyError> {
        let (units, fraction) = input.split_once('.').unwrap_or((input, ""));

        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MoneyError::InvalidFormat(input.to_string()));
        }

        // Truncate, then right-pad, to exactly two digits.
        let mut digits: String = fraction.chars().take(FRACTION_DIGITS).collect();
        while digits.len() < FRACTION_DIGITS {
            digits.push('0');
        }

        // The sign lives on the unit part, so concatenating keeps it in front.
        let joined = format!("{units}{digits}");
        joined
            .parse::<i64>()
            .map(Self)
            .map_err(|_| MoneyError::InvalidFormat(input.to_string()))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

/// Errors from decoding money strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// The string is not a decimal amount.
    #[error("invalid money format: {0:?}")]
    InvalidFormat(String),
}
