//! Ledger entities: users, plans and balance events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CapabilitySet, EventId, Money, PlanId, UserId};

// ============================================================================
// Constants
// ============================================================================

/// Achievement credited to the committer for every new customer (10.00).
pub const CUSTOMER_ACQUISITION_REWARD: Money = Money::from_minor(1000);

/// Name of the bootstrap identity.
pub const BOOTSTRAP_USER_NAME: &str = "root";

/// A stored user.
///
/// The credential is whatever the client sent (already salted and hashed); the ledger
/// only ever compares it for equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Row identifier.
    pub id: UserId,

    /// Unique login name.
    pub name: String,

    /// Pre-hashed password credential.
    #[serde(skip_serializing)]
    pub password: String,

    /// Granted capabilities.
    pub capabilities: CapabilitySet,

    /// Account balance.
    pub balance: Money,

    /// Reward accrual for customer acquisition and collected payments.
    pub achievements: Money,

    /// Subscribed plan, if any.
    pub plan: Option<PlanId>,

    /// Unique contact address. The bootstrap identity has none.
    pub email: Option<String>,
}

impl User {
    /// Whether the user holds `capability`.
    #[must_use]
    pub fn can(&self, capability: crate::Capability) -> bool {
        self.capabilities.contains(capability)
    }
}

/// Fields for inserting a user. Balance and achievements start at zero.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Unique login name.
    pub name: String,
    /// Pre-hashed password credential.
    pub password: String,
    /// Granted capabilities.
    pub capabilities: CapabilitySet,
    /// Unique contact address.
    pub email: Option<String>,
}

/// A subscription plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Row identifier.
    pub id: PlanId,
    /// Unique plan name.
    pub name: String,
    /// Plan price.
    pub price: Money,
}

/// An append-only audit record of one balance update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceEvent {
    /// Row identifier.
    pub id: EventId,

    /// The user whose balance changed.
    pub user_id: UserId,

    /// Free-text description, see [`BalanceEvent::describe`].
    pub description: String,

    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

impl BalanceEvent {
    /// Render the description recorded for a balance update.
    ///
    /// ```
    /// use ebill_core::{BalanceEvent, Money, UserId};
    ///
    /// let text = BalanceEvent::describe(
    ///     Money::from_minor(500),
    ///     Money::from_minor(1000),
    ///     Money::from_minor(1500),
    ///     UserId::new(3),
    /// );
    /// assert_eq!(text, "balance_update 5.00 from 10.00 to 15.00 by 3");
    /// ```
    #[must_use]
    pub fn describe(delta: Money, old: Money, new: Money, committer: UserId) -> String {
        format!("balance_update {delta} from {old} to {new} by {committer}")
    }
}

/// Outcome of a committed balance update.
#[derive(Debug, Clone)]
pub struct BalanceUpdate {
    /// Balance before the update.
    pub old_balance: Money,
    /// Balance after the update.
    pub new_balance: Money,
    /// The audit record written with it.
    pub event: BalanceEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_negative_delta() {
        let text = BalanceEvent::describe(
            Money::from_minor(-250),
            Money::from_minor(100),
            Money::from_minor(-150),
            UserId::new(1),
        );
        assert_eq!(text, "balance_update -2.50 from 1.00 to -1.50 by 1");
    }

    #[test]
    fn password_is_not_serialized() {
        let user = User {
            id: UserId::new(2),
            name: "alice".into(),
            password: "secret-hash".into(),
            capabilities: CapabilitySet::public(),
            balance: Money::ZERO,
            achievements: Money::ZERO,
            plan: None,
            email: Some("alice@example.com".into()),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }

    #[test]
    fn acquisition_reward_is_ten_units() {
        assert_eq!(CUSTOMER_ACQUISITION_REWARD.encode(), "10.00");
    }
}
