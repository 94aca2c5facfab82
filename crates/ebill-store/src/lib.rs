//! SQL storage layer for ebill.
//!
//! This crate provides persistent storage for users, plans and balance events behind the
//! [`Store`] trait, with a `SQLite` implementation built on `sqlx`.
//!
//! # Atomicity
//!
//! Every method that touches more than one row runs inside a single database transaction:
//! either all of its writes become visible or none do. The store is the only arbiter of
//! concurrent writes; callers never lock around it.
//!
//! # Example
//!
//! ```no_run
//! use ebill_core::{CapabilitySet, NewUser};
//! use ebill_store::{SqliteStore, Store};
//!
//! # async fn demo() -> ebill_store::Result<()> {
//! let store = SqliteStore::open("sqlite://ebill.db").await?;
//! store.initialize().await?;
//!
//! let id = store
//!     .insert_user(
//!         &NewUser {
//!             name: "alice".into(),
//!             password: "hash".into(),
//!             capabilities: CapabilitySet::parse_csv("customer").unwrap(),
//!             email: Some("alice@example.com".into()),
//!         },
//!         None,
//!     )
//!     .await?;
//! let alice = store.get_user(id).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod schema;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use ebill_core::{BalanceEvent, BalanceUpdate, Money, NewUser, Plan, PlanId, User, UserId};

/// An achievement credit applied in the same transaction as another write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementCredit {
    /// The user whose achievement accrual grows.
    pub beneficiary: UserId,
    /// Amount credited.
    pub amount: Money,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer so the ledger engine can be exercised against
/// any transactional backend.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Create the tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn initialize(&self) -> Result<()>;

    /// Check that the database answers a trivial query.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can run the query.
    async fn ping(&self) -> Result<()>;

    /// Insert the bootstrap identity if the user table is empty.
    ///
    /// Returns `true` when a row was inserted.
    ///
    /// # Errors
    ///
    /// - `StoreError::BootstrapMismatch` if the row did not get the reserved id.
    async fn ensure_bootstrap(&self, root: &NewUser) -> Result<bool>;

    /// Drop and recreate every table, then insert the bootstrap identity.
    ///
    /// # Errors
    ///
    /// - `StoreError::BootstrapMismatch` if the row did not get the reserved id; nothing is
    ///   changed in that case.
    async fn reset(&self, root: &NewUser) -> Result<()>;

    // =========================================================================
    // User Operations
    // =========================================================================

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Get a user by unique name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>>;

    /// Get a user by unique email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// List every user, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Insert a user with zero balance and achievements.
    ///
    /// When `credit` is given, the beneficiary's achievements grow in the same transaction.
    ///
    /// # Errors
    ///
    /// - `StoreError::Duplicate` if the name or email is taken.
    /// - `StoreError::NotFound` if the credit beneficiary does not exist; the new user is
    ///   not inserted in that case.
    async fn insert_user(&self, user: &NewUser, credit: Option<AchievementCredit>)
        -> Result<UserId>;

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn delete_user(&self, id: UserId) -> Result<()>;

    /// Point a user at a plan.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn set_user_plan(&self, id: UserId, plan: PlanId) -> Result<()>;

    /// Replace a user's credential.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn set_user_password(&self, id: UserId, password: &str) -> Result<()>;

    // =========================================================================
    // Plan Operations
    // =========================================================================

    /// Get a plan by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_plan(&self, id: PlanId) -> Result<Option<Plan>>;

    /// Get a plan by unique name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_plan_by_name(&self, name: &str) -> Result<Option<Plan>>;

    /// List every plan, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_plans(&self) -> Result<Vec<Plan>>;

    /// Insert a plan.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` if the name is taken.
    async fn insert_plan(&self, name: &str, price: Money) -> Result<PlanId>;

    /// Delete a plan unless a user still references it.
    ///
    /// # Errors
    ///
    /// - `StoreError::PlanInUse` naming the first referencing user; the plan is kept.
    /// - `StoreError::NotFound` if the plan doesn't exist.
    async fn delete_plan_if_unused(&self, id: PlanId) -> Result<()>;

    // =========================================================================
    // Balance Operations
    // =========================================================================

    /// Apply `delta` to the target's balance and append the audit event atomically.
    ///
    /// A positive delta is also credited to the committer's achievements. All three writes
    /// commit together or not at all.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the target or committer doesn't exist.
    /// - `StoreError::Overflow` if the new balance does not fit.
    async fn apply_balance_update(
        &self,
        target: UserId,
        committer: UserId,
        delta: Money,
    ) -> Result<BalanceUpdate>;

    /// List a user's balance events, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_balance_events(&self, user: UserId) -> Result<Vec<BalanceEvent>>;
}
