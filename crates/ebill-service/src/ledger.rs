//! Ledger operations engine.
//!
//! Each operation validates its inputs and checks the committer's capabilities before it
//! touches storage. Writes that span several rows go through a single `Store` call, which
//! commits them in one transaction.
//!
//! # Achievement accrual
//!
//! Two independent rules credit the committer's achievements:
//!
//! - creating an identity that holds `customer` credits [`CUSTOMER_ACQUISITION_REWARD`];
//! - a positive balance update credits the delta.
//!
//! They compound: a customer-service agent who also holds `cashier` earns both.

use std::collections::HashMap;
use std::sync::Arc;

use ebill_core::validation::{check_email, check_name};
use ebill_core::{
    BalanceUpdate, BillingError, Capability, CapabilitySet, Money, NewUser, PlanId, Result, Role,
    User, UserId, BOOTSTRAP_USER_NAME, CUSTOMER_ACQUISITION_REWARD,
};
use ebill_store::{AchievementCredit, Store};

use crate::encoding::{BalanceLog, Listing, PlanInfo, UserInfo};
use crate::permissions::PermissionEvaluator;
use crate::session::SessionManager;

/// The permission-gated operations over users, plans and balances.
pub struct Ledger {
    store: Arc<dyn Store>,
    permissions: PermissionEvaluator,
    sessions: Arc<SessionManager>,
}

impl Ledger {
    /// Create a ledger over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, sessions: Arc<SessionManager>) -> Self {
        Self {
            permissions: PermissionEvaluator::new(Arc::clone(&store)),
            store,
            sessions,
        }
    }

    /// The permission evaluator used by every operation.
    #[must_use]
    pub fn permissions(&self) -> &PermissionEvaluator {
        &self.permissions
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Create an identity.
    ///
    /// When the new identity holds `customer`, the committer's achievements grow by
    /// [`CUSTOMER_ACQUISITION_REWARD`] in the same transaction.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` for a bad name, email or capability list.
    /// - `PermissionDenied` if the committer may not create this kind of identity.
    /// - `Conflict` if the name or email is taken.
    pub async fn add_user(
        &self,
        committer: UserId,
        name: &str,
        password: &str,
        capabilities_csv: &str,
        email: &str,
    ) -> Result<UserId> {
        check_name("name", name)?;
        check_email(email)?;
        let capabilities = CapabilitySet::parse_csv(capabilities_csv)?;

        if !self
            .permissions
            .authorize_target_mutation(committer, &capabilities)
            .await
        {
            tracing::warn!(committer = %committer, target = %name, "AddUser denied");
            return Err(BillingError::denied(format!(
                "may not create an identity with {capabilities}"
            )));
        }

        let credit = capabilities
            .contains(Capability::Customer)
            .then_some(AchievementCredit {
                beneficiary: committer,
                amount: CUSTOMER_ACQUISITION_REWARD,
            });

        let user = NewUser {
            name: name.to_string(),
            password: password.to_string(),
            capabilities,
            email: Some(email.to_string()),
        };
        let id = self.store.insert_user(&user, credit).await?;

        tracing::info!(
            user_id = %id,
            name = %name,
            capabilities = %user.capabilities,
            committer = %committer,
            "User created"
        );
        Ok(id)
    }

    /// Delete an identity by name and revoke its sessions.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no user has that name.
    /// - `PermissionDenied` if the committer may not remove this kind of identity.
    /// - `Conflict` for the bootstrap identity.
    pub async fn remove_user(&self, committer: UserId, name: &str) -> Result<()> {
        let target = self.resolve_user(name).await?;

        if !self
            .permissions
            .authorize_target_mutation(committer, &target.capabilities)
            .await
        {
            tracing::warn!(committer = %committer, target = %name, "RemoveUser denied");
            return Err(BillingError::denied(format!("may not remove {name}")));
        }
        if target.id.is_bootstrap() {
            return Err(BillingError::Conflict(
                "the bootstrap identity cannot be removed".into(),
            ));
        }

        self.store.delete_user(target.id).await?;
        self.sessions.revoke_identity(target.id).await;

        tracing::info!(user_id = %target.id, name = %name, committer = %committer, "User removed");
        Ok(())
    }

    /// Point a customer at a plan.
    ///
    /// # Errors
    ///
    /// - `PermissionDenied` if the committer lacks `customer-service` or the target lacks
    ///   `customer`.
    /// - `NotFound` if the user or plan does not exist.
    pub async fn update_user_plan(
        &self,
        committer: UserId,
        name: &str,
        plan_name: &str,
    ) -> Result<()> {
        self.permissions
            .require(committer, Capability::CustomerService)
            .await?;
        check_name("plan", plan_name)?;

        let target = self.resolve_customer(name).await?;
        let plan = self
            .store
            .find_plan_by_name(plan_name)
            .await?
            .ok_or_else(|| BillingError::not_found("plan", plan_name))?;

        self.store.set_user_plan(target.id, plan.id).await?;

        tracing::info!(user_id = %target.id, plan = %plan.name, committer = %committer, "Plan assigned");
        Ok(())
    }

    /// Apply a signed delta to a customer's balance.
    ///
    /// The balance change, the committer's achievement credit (positive deltas only) and
    /// the audit event commit together.
    ///
    /// # Errors
    ///
    /// - `PermissionDenied` if the committer lacks `cashier` or the target lacks `customer`.
    /// - `InvalidFormat` if the delta is not a money string.
    /// - `NotFound` if the user does not exist.
    pub async fn update_user_balance(
        &self,
        committer: UserId,
        name: &str,
        delta: &str,
    ) -> Result<BalanceUpdate> {
        self.permissions.require(committer, Capability::Cashier).await?;
        let delta = Money::decode(delta)?;

        let target = self.resolve_customer(name).await?;
        let update = self
            .store
            .apply_balance_update(target.id, committer, delta)
            .await?;

        tracing::info!(
            user_id = %target.id,
            delta = %delta,
            old_balance = %update.old_balance,
            new_balance = %update.new_balance,
            committer = %committer,
            "Balance updated"
        );
        Ok(update)
    }

    // =========================================================================
    // Plans
    // =========================================================================

    /// Create a plan.
    ///
    /// # Errors
    ///
    /// - `PermissionDenied` without `customer-service`.
    /// - `InvalidFormat` for a bad name or price.
    /// - `Conflict` if the name is taken.
    pub async fn add_plan(&self, committer: UserId, name: &str, price: &str) -> Result<PlanId> {
        self.permissions
            .require(committer, Capability::CustomerService)
            .await?;
        check_name("plan", name)?;
        let price = Money::decode(price)?;

        let id = self.store.insert_plan(name, price).await?;

        tracing::info!(plan_id = %id, plan = %name, price = %price, committer = %committer, "Plan created");
        Ok(id)
    }

    /// Delete a plan no user references.
    ///
    /// # Errors
    ///
    /// - `PermissionDenied` without `customer-service`.
    /// - `NotFound` if the plan does not exist.
    /// - `Conflict` naming the first user still on the plan; the plan is kept.
    pub async fn remove_plan(&self, committer: UserId, name: &str) -> Result<()> {
        self.permissions
            .require(committer, Capability::CustomerService)
            .await?;
        check_name("plan", name)?;

        let plan = self
            .store
            .find_plan_by_name(name)
            .await?
            .ok_or_else(|| BillingError::not_found("plan", name))?;
        self.store.delete_plan_if_unused(plan.id).await?;

        tracing::info!(plan_id = %plan.id, plan = %name, committer = %committer, "Plan removed");
        Ok(())
    }

    // =========================================================================
    // Administration
    // =========================================================================

    /// Drop all data and recreate the bootstrap identity with `password`.
    ///
    /// Every open session is revoked afterwards.
    ///
    /// # Errors
    ///
    /// - `PermissionDenied` without `admin`.
    /// - `InvalidFormat` for an empty password.
    /// - `Conflict` if the new bootstrap row did not get the reserved identifier; nothing
    ///   is changed in that case.
    pub async fn reset_database(&self, committer: UserId, password: &str) -> Result<()> {
        self.permissions.require(committer, Capability::Admin).await?;
        if password.is_empty() {
            return Err(BillingError::invalid_format("password", password));
        }

        self.store.reset(&self.bootstrap_user(password)).await?;
        let revoked = self.sessions.revoke_all().await;

        tracing::warn!(committer = %committer, revoked, "Database reset");
        Ok(())
    }

    /// The bootstrap identity record for `password`.
    #[must_use]
    pub fn bootstrap_user(&self, password: &str) -> NewUser {
        NewUser {
            name: BOOTSTRAP_USER_NAME.to_string(),
            password: password.to_string(),
            capabilities: self.permissions.roles().capabilities(Role::Admin),
            email: None,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Look up one user and its plan.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user, or the plan it references, does not exist.
    /// - `PermissionDenied` when querying someone else without `customer-service`.
    pub async fn query_user_info(&self, committer: UserId, name: &str) -> Result<UserInfo> {
        let user = self.resolve_user(name).await?;
        self.authorize_query(committer, user.id).await?;

        let plan = match user.plan {
            Some(id) => Some(
                self.store
                    .get_plan(id)
                    .await?
                    .ok_or_else(|| BillingError::not_found("plan", id.to_string()))?,
            ),
            None => None,
        };

        Ok(UserInfo { user, plan })
    }

    /// List one user's balance events, oldest first.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist.
    /// - `PermissionDenied` when querying someone else without `customer-service`.
    pub async fn query_balance_log(&self, committer: UserId, name: &str) -> Result<BalanceLog> {
        let user = self.resolve_user(name).await?;
        self.authorize_query(committer, user.id).await?;

        let events = self.store.list_balance_events(user.id).await?;
        Ok(BalanceLog(events))
    }

    /// List every user with its plan.
    ///
    /// # Errors
    ///
    /// - `PermissionDenied` without `customer-service`.
    /// - `NotFound` if a user references a missing plan.
    pub async fn list_all_user_info(&self, committer: UserId) -> Result<Listing<UserInfo>> {
        self.permissions
            .require(committer, Capability::CustomerService)
            .await?;

        let plans: HashMap<PlanId, _> = self
            .store
            .list_plans()
            .await?
            .into_iter()
            .map(|plan| (plan.id, plan))
            .collect();

        self.store
            .list_users()
            .await?
            .into_iter()
            .map(|user| -> Result<UserInfo> {
                let plan = match user.plan {
                    Some(id) => Some(
                        plans
                            .get(&id)
                            .cloned()
                            .ok_or_else(|| BillingError::not_found("plan", id.to_string()))?,
                    ),
                    None => None,
                };
                Ok(UserInfo { user, plan })
            })
            .collect::<Result<Vec<_>>>()
            .map(Listing)
    }

    /// List every plan.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` without `customer-service`.
    pub async fn list_all_plan_info(&self, committer: UserId) -> Result<Listing<PlanInfo>> {
        self.permissions
            .require(committer, Capability::CustomerService)
            .await?;

        let plans = self.store.list_plans().await?;
        Ok(Listing(plans.into_iter().map(PlanInfo).collect()))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn resolve_user(&self, name: &str) -> Result<User> {
        check_name("name", name)?;
        self.store
            .find_user_by_name(name)
            .await?
            .ok_or_else(|| BillingError::not_found("user", name))
    }

    async fn resolve_customer(&self, name: &str) -> Result<User> {
        let user = self.resolve_user(name).await?;
        if !user.can(Capability::Customer) {
            return Err(BillingError::denied(format!("{name} is not a customer")));
        }
        Ok(user)
    }

    async fn authorize_query(&self, committer: UserId, target: UserId) -> Result<()> {
        if committer == target {
            return Ok(());
        }
        self.permissions
            .require(committer, Capability::CustomerService)
            .await
    }
}
