//! Input validation patterns.
//!
//! Every name, email, or domain that reaches a store lookup is checked here first.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::BillingError;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_, @.:;-]+$").expect("valid regex"));

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+$").expect("valid regex"));

static DOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9:./_-]+$").expect("valid regex"));

/// Protocols accepted in password-reset links.
pub const RESET_LINK_PROTOCOLS: [&str; 2] = ["http:", "https:"];

/// Return true if `name` is acceptable as a user or plan name.
///
/// ```
/// assert!(ebill_core::validation::is_valid_name("alice_01"));
/// assert!(!ebill_core::validation::is_valid_name("bob'; --"));
/// ```
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Return true if `email` looks like a mail address.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Return true if `domain` is acceptable as the host part of a reset link.
#[must_use]
pub fn is_valid_domain(domain: &str) -> bool {
    DOMAIN_RE.is_match(domain)
}

/// Check a user or plan name.
///
/// # Errors
///
/// Returns `BillingError::InvalidFormat` if the name fails the pattern.
pub fn check_name(field: &'static str, name: &str) -> Result<(), BillingError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(BillingError::invalid_format(field, name))
    }
}

/// Check an email address.
///
/// # Errors
///
/// Returns `BillingError::InvalidFormat` if the address fails the pattern.
pub fn check_email(email: &str) -> Result<(), BillingError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(BillingError::invalid_format("email", email))
    }
}

/// Check the domain and protocol of a reset link.
///
/// # Errors
///
/// Returns `BillingError::InvalidFormat` if either part is rejected.
pub fn check_link_target(domain: &str, protocol: &str) -> Result<(), BillingError> {
    if !is_valid_domain(domain) {
        return Err(BillingError::invalid_format("domain", domain));
    }
    if !RESET_LINK_PROTOCOLS.contains(&protocol) {
        return Err(BillingError::invalid_format("proto", protocol));
    }
    Ok(())
}
