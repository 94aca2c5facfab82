//! Credential helpers.
//!
//! Clients hash passwords before sending them, so the ledger stores and compares opaque
//! hex strings. The hash function lives here so the service can turn a configured
//! bootstrap password into the same form clients produce.

use sha2::{Digest, Sha256};

/// Salt used by clients when hashing passwords.
pub const PASSWORD_SALT: &str = "rsalt";

/// Compute `hex(sha256(salt || password || salt))`.
///
/// ```
/// let hash = ebill_core::credentials::password_salted_hash("hunter2", "rsalt");
/// assert_eq!(hash.len(), 64);
/// ```
#[must_use]
pub fn password_salted_hash(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time string comparison for credentials.
///
/// Only the length leaks; the position of the first differing byte does not.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
