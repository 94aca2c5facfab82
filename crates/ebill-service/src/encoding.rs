//! Text encoding of query results.
//!
//! Single records are ampersand-joined `key=value` pairs in a fixed field order. Listings
//! join records with `\n` and carry no trailing newline. Values are written as stored;
//! names and capability lists are already restricted by the validation patterns.

use std::fmt;

use ebill_core::{BalanceEvent, Money, Plan, User};

/// A user together with the plan it references.
#[derive(Debug, Clone)]
pub struct UserInfo {
    /// The user record.
    pub user: User,
    /// The referenced plan, if any.
    pub plan: Option<Plan>,
}

impl fmt::Display for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (plan_name, plan_price) = match &self.plan {
            Some(plan) => (plan.name.as_str(), plan.price),
            None => ("", Money::ZERO),
        };
        write!(
            f,
            "name={}&permission={}&balance={}&achi={}&plan_name={}&plan_price={}",
            self.user.name,
            self.user.capabilities,
            self.user.balance,
            self.user.achievements,
            plan_name,
            plan_price,
        )
    }
}

/// A plan rendered as `plan_name=..&plan_price=..`.
#[derive(Debug, Clone)]
pub struct PlanInfo(pub Plan);

impl fmt::Display for PlanInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plan_name={}&plan_price={}", self.0.name, self.0.price)
    }
}

/// Newline-joined records.
#[derive(Debug, Clone)]
pub struct Listing<T>(pub Vec<T>);

impl<T> Listing<T> {
    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: fmt::Display> fmt::Display for Listing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, record) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{record}")?;
        }
        Ok(())
    }
}

/// A user's balance events, rendered as `events=` plus newline-joined descriptions.
#[derive(Debug, Clone)]
pub struct BalanceLog(pub Vec<BalanceEvent>);

impl fmt::Display for BalanceLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("events=")?;
        for (index, event) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            f.write_str(&event.description)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ebill_core::{CapabilitySet, EventId, PlanId, UserId};

    fn alice(plan: Option<PlanId>) -> User {
        User {
            id: UserId::new(2),
            name: "alice".into(),
            password: "hash".into(),
            capabilities: CapabilitySet::parse_csv("customer").unwrap(),
            balance: Money::from_minor(1500),
            achievements: Money::ZERO,
            plan,
            email: Some("alice@example.com".into()),
        }
    }

    fn gold() -> Plan {
        Plan {
            id: PlanId::new(1),
            name: "gold".into(),
            price: Money::from_minor(4999),
        }
    }

    fn event(id: i64, description: &str) -> BalanceEvent {
        BalanceEvent {
            id: EventId::new(id),
            user_id: UserId::new(2),
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn user_record_field_order() {
        let info = UserInfo {
            user: alice(Some(PlanId::new(1))),
            plan: Some(gold()),
        };
        assert_eq!(
            info.to_string(),
            "name=alice&permission=customer,public&balance=15.00&achi=0.00\
             &plan_name=gold&plan_price=49.99"
        );
    }

    #[test]
    fn user_without_plan() {
        let info = UserInfo {
            user: alice(None),
            plan: None,
        };
        assert!(info.to_string().ends_with("&plan_name=&plan_price=0.00"));
    }

    #[test]
    fn listing_has_no_trailing_newline() {
        let listing = Listing(vec![
            PlanInfo(gold()),
            PlanInfo(Plan {
                id: PlanId::new(2),
                name: "basic".into(),
                price: Money::from_minor(500),
            }),
        ]);
        assert_eq!(
            listing.to_string(),
            "plan_name=gold&plan_price=49.99\nplan_name=basic&plan_price=5.00"
        );
        assert_eq!(Listing::<PlanInfo>(Vec::new()).to_string(), "");
    }

    #[test]
    fn balance_log_prefix() {
        assert_eq!(BalanceLog(Vec::new()).to_string(), "events=");

        let log = BalanceLog(vec![event(1, "first"), event(2, "second")]);
        assert_eq!(log.to_string(), "events=first\nsecond");
    }
}
