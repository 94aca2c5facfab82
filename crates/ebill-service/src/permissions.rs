//! Capability checks against stored identities.

use std::sync::Arc;

use ebill_core::{BillingError, Capability, CapabilitySet, Result, RoleTable, UserId};
use ebill_store::Store;

/// Answers "may this identity do that?" from the identity's stored capability set.
///
/// Every check is fail-closed: an identity that cannot be loaded holds no capabilities.
pub struct PermissionEvaluator {
    store: Arc<dyn Store>,
    roles: RoleTable,
}

impl PermissionEvaluator {
    /// Create an evaluator with the standard role table.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            roles: RoleTable::new(),
        }
    }

    /// The role table built at startup.
    #[must_use]
    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    /// Whether `user` currently holds `capability`.
    pub async fn has_capability(&self, user: UserId, capability: Capability) -> bool {
        match self.store.get_user(user).await {
            Ok(Some(record)) => record.can(capability),
            Ok(None) => {
                tracing::debug!(user_id = %user, "Capability check for unknown identity");
                false
            }
            Err(e) => {
                tracing::warn!(user_id = %user, error = %e, "Capability check failed closed");
                false
            }
        }
    }

    /// Require `capability`, failing with `PermissionDenied`.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` if the committer does not hold the capability.
    pub async fn require(&self, committer: UserId, capability: Capability) -> Result<()> {
        if self.has_capability(committer, capability).await {
            return Ok(());
        }

        tracing::warn!(user_id = %committer, capability = %capability, "Permission denied");
        Err(BillingError::denied(format!(
            "{capability} capability required"
        )))
    }

    /// Whether `committer` may create or remove an identity holding `target`.
    ///
    /// Staff targets need `admin`; customer-like targets need `customer-service`. The
    /// bootstrap identity is always allowed.
    pub async fn authorize_target_mutation(
        &self,
        committer: UserId,
        target: &CapabilitySet,
    ) -> bool {
        if committer.is_bootstrap() {
            return true;
        }

        let required = if target.is_customer_like() {
            Capability::CustomerService
        } else {
            Capability::Admin
        };
        self.has_capability(committer, required).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebill_core::{NewUser, Role, BOOTSTRAP_USER_ID};
    use ebill_store::SqliteStore;

    async fn setup() -> (Arc<dyn Store>, PermissionEvaluator) {
        let store = SqliteStore::in_memory().await.unwrap();
        store.initialize().await.unwrap();
        store
            .ensure_bootstrap(&NewUser {
                name: "root".into(),
                password: "root-hash".into(),
                capabilities: RoleTable::new().capabilities(Role::Admin),
                email: None,
            })
            .await
            .unwrap();

        let store: Arc<dyn Store> = Arc::new(store);
        let evaluator = PermissionEvaluator::new(Arc::clone(&store));
        (store, evaluator)
    }

    async fn add(store: &Arc<dyn Store>, name: &str, capabilities: &str) -> UserId {
        store
            .insert_user(
                &NewUser {
                    name: name.into(),
                    password: "hash".into(),
                    capabilities: CapabilitySet::parse_csv(capabilities).unwrap(),
                    email: None,
                },
                None,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn bootstrap_holds_every_capability() {
        let (_, evaluator) = setup().await;
        for capability in Capability::ALL {
            assert!(evaluator.has_capability(BOOTSTRAP_USER_ID, capability).await);
        }
    }

    #[tokio::test]
    async fn unknown_identity_fails_closed() {
        let (_, evaluator) = setup().await;
        assert!(!evaluator.has_capability(UserId::new(77), Capability::Public).await);
        assert!(matches!(
            evaluator.require(UserId::new(77), Capability::Public).await,
            Err(BillingError::PermissionDenied { .. })
        ));
    }

    #[tokio::test]
    async fn target_mutation_rules() {
        let (store, evaluator) = setup().await;
        let service = add(&store, "sam", "customer-service").await;
        let admin = add(&store, "ada", "admin").await;
        let customer = add(&store, "cat", "customer").await;

        let customer_target = CapabilitySet::parse_csv("customer").unwrap();
        let staff_target = CapabilitySet::parse_csv("cashier").unwrap();

        assert!(evaluator.authorize_target_mutation(service, &customer_target).await);
        assert!(!evaluator.authorize_target_mutation(service, &staff_target).await);

        // Admin alone does not cover customer-service work.
        assert!(evaluator.authorize_target_mutation(admin, &staff_target).await);
        assert!(!evaluator.authorize_target_mutation(admin, &customer_target).await);

        assert!(!evaluator.authorize_target_mutation(customer, &customer_target).await);
        assert!(evaluator.authorize_target_mutation(BOOTSTRAP_USER_ID, &staff_target).await);
    }
}
