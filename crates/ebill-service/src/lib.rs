//! EBill ledger service.
//!
//! This crate provides the operations engine and HTTP API of the ledger:
//!
//! - Session tokens ([`SessionManager`])
//! - Capability checks ([`PermissionEvaluator`])
//! - Permission-gated user, plan and balance operations ([`Ledger`])
//! - Password change and reset mail ([`PasswordRecovery`])
//! - Tracked background mail sends ([`NotificationTasks`])
//!
//! # Authentication
//!
//! Clients log in with a name and a salted password hash and receive an opaque token,
//! sent back as `Authorization: Bearer <token>`. Tokens live for the life of the process.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result

pub mod auth;
pub mod config;
pub mod encoding;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod notify;
pub mod permissions;
pub mod recovery;
pub mod routes;
pub mod session;
pub mod state;

pub use config::ServiceConfig;
pub use encoding::{BalanceLog, Listing, PlanInfo, UserInfo};
pub use error::ApiError;
pub use ledger::Ledger;
pub use notify::{MailError, Mailer, NotificationTasks, SmtpMailer};
pub use permissions::PermissionEvaluator;
pub use recovery::PasswordRecovery;
pub use routes::create_router;
pub use session::{SessionManager, TokenGenerator};
pub use state::AppState;
