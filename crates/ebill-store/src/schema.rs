//! Database schema definitions.
//!
//! Three tables back the ledger. Balance events are append-only and keep their `user_id`
//! even after the user row is deleted, so there is no foreign key.

/// Table names.
pub mod table {
    /// User records, keyed by `id`; `name` and `email` are unique.
    pub const USERS: &str = "users";

    /// Plan records, keyed by `id`; `name` is unique.
    pub const PLANS: &str = "plans";

    /// Append-only balance audit trail, keyed by `id`.
    pub const BALANCE_EVENTS: &str = "balance_events";
}

const CREATE_USERS: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    capabilities TEXT NOT NULL,
    balance INTEGER NOT NULL DEFAULT 0,
    achievements INTEGER NOT NULL DEFAULT 0,
    plan INTEGER NOT NULL DEFAULT 0,
    email TEXT UNIQUE
)";

const CREATE_PLANS: &str = "CREATE TABLE IF NOT EXISTS plans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    price INTEGER NOT NULL
)";

const CREATE_BALANCE_EVENTS: &str = "CREATE TABLE IF NOT EXISTS balance_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    description TEXT NOT NULL,
    created_at TEXT NOT NULL
)";

const CREATE_BALANCE_EVENTS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS balance_events_by_user ON balance_events (user_id)";

/// Statements creating every table, in dependency order.
#[must_use]
pub fn create_statements() -> Vec<&'static str> {
    vec![
        CREATE_USERS,
        CREATE_PLANS,
        CREATE_BALANCE_EVENTS,
        CREATE_BALANCE_EVENTS_INDEX,
    ]
}

/// Statements dropping every table. Dropping an `AUTOINCREMENT` table also resets its
/// sequence, so the next user row gets id 1 again.
#[must_use]
pub fn drop_statements() -> Vec<&'static str> {
    vec![
        "DROP TABLE IF EXISTS users",
        "DROP TABLE IF EXISTS balance_events",
        "DROP TABLE IF EXISTS plans",
    ]
}
