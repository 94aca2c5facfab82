//! API handlers.
//!
//! Requests are form-encoded; successful responses are `text/plain` in the ledger's
//! `key=value` encoding. Errors are JSON, see [`crate::error::ApiError`].

pub mod admin;
pub mod health;
pub mod password;
pub mod plans;
pub mod session;
pub mod users;

/// Body returned by operations with nothing else to report.
pub const OK: &str = "ok";
