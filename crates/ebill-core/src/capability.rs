//! Capabilities and roles.
//!
//! A capability is one permission atom. Every identity stores a non-empty set of them and
//! always holds [`Capability::Public`]. Roles are a fixed, flat mapping onto capability sets;
//! there is no inheritance between roles.
//!
//! # Persistence encoding
//!
//! Sets are stored and reported as comma-joined names in declaration order, for example
//! `cashier,public`. [`CapabilitySet::to_csv`] and [`CapabilitySet::parse_csv`] are the only
//! code that knows this format.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single permission atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Full administration: staff management and database reset.
    Admin,
    /// Can post balance updates to customers.
    Cashier,
    /// Can manage customers and plans.
    CustomerService,
    /// A paying customer; may hold a plan and a balance.
    Customer,
    /// Baseline capability held by everyone.
    Public,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Admin,
        Self::Cashier,
        Self::CustomerService,
        Self::Customer,
        Self::Public,
    ];

    /// Persisted name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Cashier => "cashier",
            Self::CustomerService => "customer-service",
            Self::Customer => "customer",
            Self::Public => "public",
        }
    }

    /// Whether this capability marks an identity as staff.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Cashier | Self::CustomerService)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = CapabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CapabilityError::Unknown(s.to_string()))
    }
}

/// A set of capabilities. Always contains [`Capability::Public`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// The baseline set: just `public`.
    #[must_use]
    pub fn public() -> Self {
        Self(BTreeSet::from([Capability::Public]))
    }

    /// Parse the comma-joined persistence form.
    ///
    /// Surrounding whitespace and empty segments are ignored; `public` is added if absent.
    ///
    /// # Errors
    ///
    /// Returns `CapabilityError::Unknown` for a name outside the closed capability set.
    pub fn parse_csv(csv: &str) -> Result<Self, CapabilityError> {
        csv.split(',')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(str::parse::<Capability>)
            .collect()
    }

    /// Encode into the comma-joined persistence form.
    #[must_use]
    pub fn to_csv(&self) -> String {
        self.0
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Whether the set holds `capability`.
    #[must_use]
    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    /// Whether the set belongs to a customer-like identity: one holding no staff capability.
    #[must_use]
    pub fn is_customer_like(&self) -> bool {
        !self.0.iter().any(|c| c.is_staff())
    }

    /// Iterate in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    /// Number of capabilities held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty. Never true for sets built through this API.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self::public()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set: BTreeSet<Capability> = iter.into_iter().collect();
        set.insert(Capability::Public);
        Self(set)
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_csv())
    }
}

impl TryFrom<String> for CapabilitySet {
    type Error = CapabilityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_csv(&value)
    }
}

impl From<CapabilitySet> for String {
    fn from(set: CapabilitySet) -> Self {
        set.to_csv()
    }
}

/// A named bundle of capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Holds every capability. The bootstrap identity has this role.
    Admin,
    /// Front-desk staff taking payments.
    Cashier,
    /// Support staff managing customers and plans.
    Service,
    /// A paying customer.
    Customer,
}

impl Role {
    /// Every role.
    pub const ALL: [Self; 4] = [Self::Admin, Self::Cashier, Self::Service, Self::Customer];

    /// Role name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Cashier => "cashier",
            Self::Service => "service",
            Self::Customer => "customer",
        }
    }

    const fn grants(self) -> &'static [Capability] {
        match self {
            Self::Admin => &Capability::ALL,
            Self::Cashier => &[Capability::Cashier, Capability::Public],
            Self::Service => &[Capability::CustomerService, Capability::Public],
            Self::Customer => &[Capability::Customer, Capability::Public],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The static role → capability table, built once at startup.
#[derive(Debug, Clone)]
pub struct RoleTable {
    roles: HashMap<Role, CapabilitySet>,
}

impl RoleTable {
    /// Build the standard table.
    #[must_use]
    pub fn new() -> Self {
        let roles = Role::ALL
            .into_iter()
            .map(|role| (role, role.grants().iter().copied().collect()))
            .collect();
        Self { roles }
    }

    /// Capabilities granted by `role`.
    #[must_use]
    pub fn capabilities(&self, role: Role) -> CapabilitySet {
        self.roles
            .get(&role)
            .cloned()
            .unwrap_or_else(CapabilitySet::public)
    }
}

impl Default for RoleTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from parsing capabilities.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    /// Name outside the closed capability set.
    #[error("unknown capability: {0:?}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_roundtrip_is_canonical() {
        let set = CapabilitySet::parse_csv("public, customer ,cashier").unwrap();
        assert_eq!(set.to_csv(), "cashier,customer,public");
        assert_eq!(CapabilitySet::parse_csv(&set.to_csv()).unwrap(), set);
    }

    #[test]
    fn public_is_always_present() {
        let set = CapabilitySet::parse_csv("customer").unwrap();
        assert!(set.contains(Capability::Public));
        assert_eq!(CapabilitySet::parse_csv("").unwrap(), CapabilitySet::public());
        assert_eq!(CapabilitySet::parse_csv(",,").unwrap(), CapabilitySet::public());
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(
            CapabilitySet::parse_csv("customer,root"),
            Err(CapabilityError::Unknown("root".into()))
        );
    }

    #[test]
    fn customer_like_classification() {
        assert!(CapabilitySet::parse_csv("customer").unwrap().is_customer_like());
        assert!(CapabilitySet::public().is_customer_like());
        assert!(!CapabilitySet::parse_csv("customer,cashier").unwrap().is_customer_like());
        assert!(!CapabilitySet::parse_csv("customer-service").unwrap().is_customer_like());
    }

    #[test]
    fn role_table_matches_grants() {
        let table = RoleTable::new();
        let admin = table.capabilities(Role::Admin);
        for capability in Capability::ALL {
            assert!(admin.contains(capability), "admin lacks {capability}");
        }
        assert_eq!(table.capabilities(Role::Cashier).to_csv(), "cashier,public");
        assert_eq!(table.capabilities(Role::Service).to_csv(), "customer-service,public");
        assert_eq!(table.capabilities(Role::Customer).to_csv(), "customer,public");
    }

    #[test]
    fn serde_uses_csv() {
        let set = CapabilitySet::parse_csv("cashier").unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "\"cashier,public\"");
        let back: CapabilitySet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
