//! Core types and utilities for ebill.
//!
//! This crate provides the foundational types of the ledger:
//!
//! - **Identifiers**: `UserId`, `PlanId`, `EventId`
//! - **Money**: `Money`, a fixed-point amount with a two-decimal string codec
//! - **Capabilities**: `Capability`, `CapabilitySet`, `Role`, `RoleTable`
//! - **Entities**: `User`, `Plan`, `BalanceEvent`
//! - **Validation** and **credential** helpers
//!
//! # Minor Units
//!
//! **1 minor unit = 0.01 of the display currency**
//!
//! - A balance of `10.32` is stored as `1032`
//! - Amounts are `i64`, never floating point

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod capability;
pub mod credentials;
pub mod error;
pub mod ids;
pub mod money;
pub mod validation;

pub use account::{
    BalanceEvent, BalanceUpdate, NewUser, Plan, User, BOOTSTRAP_USER_NAME,
    CUSTOMER_ACQUISITION_REWARD,
};
pub use capability::{Capability, CapabilityError, CapabilitySet, Role, RoleTable};
pub use error::{BillingError, Result};
pub use ids::{EventId, IdError, PlanId, UserId, BOOTSTRAP_USER_ID};
pub use money::{Money, MoneyError};
