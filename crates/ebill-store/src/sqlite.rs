//! `SQLite` storage implementation.
//!
//! This module provides the `SqliteStore` implementation of the `Store` trait. All
//! statements are parameterized; no caller-supplied text is ever spliced into SQL.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, Sqlite, Transaction};

use ebill_core::{
    BalanceEvent, BalanceUpdate, CapabilitySet, EventId, Money, NewUser, Plan, PlanId, User,
    UserId, BOOTSTRAP_USER_ID,
};

use crate::error::{Result, StoreError};
use crate::schema;
use crate::{AchievementCredit, Store};

/// Pool size for file-backed databases.
const MAX_CONNECTIONS: u32 = 5;

/// How long to wait for a pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a writer waits for the database write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Write transactions take the write lock up front, so a read-then-write never has to
/// upgrade its lock while another writer holds it.
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

/// SQLite-backed storage implementation.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open or create a database at the given `sqlite://` URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or the database cannot be opened.
    pub async fn open(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;

        tracing::debug!(url = %url, "SQLite pool established");
        Ok(Self { pool })
    }

    /// Open a private in-memory database.
    ///
    /// The pool holds exactly one connection for its whole life, since every in-memory
    /// connection would otherwise see its own empty database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Start a transaction holding the write lock.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with(BEGIN_WRITE).await?)
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(FromRow)]
struct UserRow {
    id: i64,
    name: String,
    password: String,
    capabilities: String,
    balance: i64,
    achievements: i64,
    plan: i64,
    email: Option<String>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self> {
        let capabilities = CapabilitySet::parse_csv(&row.capabilities)
            .map_err(|e| StoreError::Serialization(format!("user {}: {e}", row.id)))?;

        Ok(Self {
            id: UserId::new(row.id),
            name: row.name,
            password: row.password,
            capabilities,
            balance: Money::from_minor(row.balance),
            achievements: Money::from_minor(row.achievements),
            plan: PlanId::from_column(row.plan),
            email: row.email,
        })
    }
}

#[derive(FromRow)]
struct PlanRow {
    id: i64,
    name: String,
    price: i64,
}

impl From<PlanRow> for Plan {
    fn from(row: PlanRow) -> Self {
        Self {
            id: PlanId::new(row.id),
            name: row.name,
            price: Money::from_minor(row.price),
        }
    }
}

#[derive(FromRow)]
struct EventRow {
    id: i64,
    user_id: i64,
    description: String,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for BalanceEvent {
    fn from(row: EventRow) -> Self {
        Self {
            id: EventId::new(row.id),
            user_id: UserId::new(row.user_id),
            description: row.description,
            created_at: row.created_at,
        }
    }
}

fn user_not_found(id: UserId) -> StoreError {
    StoreError::NotFound {
        entity: "user",
        id: id.to_string(),
    }
}

fn plan_not_found(id: PlanId) -> StoreError {
    StoreError::NotFound {
        entity: "plan",
        id: id.to_string(),
    }
}

// ============================================================================
// Transaction Helpers
// ============================================================================

async fn insert_user_row(tx: &mut Transaction<'_, Sqlite>, user: &NewUser) -> Result<UserId> {
    let result = sqlx::query(
        "INSERT INTO users (name, password, capabilities, balance, achievements, plan, email)
         VALUES (?, ?, ?, 0, 0, 0, ?)",
    )
    .bind(&user.name)
    .bind(&user.password)
    .bind(user.capabilities.to_csv())
    .bind(user.email.as_deref())
    .execute(&mut **tx)
    .await?;

    Ok(UserId::new(result.last_insert_rowid()))
}

async fn insert_bootstrap_row(tx: &mut Transaction<'_, Sqlite>, root: &NewUser) -> Result<()> {
    let id = insert_user_row(tx, root).await?;
    if id != BOOTSTRAP_USER_ID {
        return Err(StoreError::BootstrapMismatch {
            got: id,
            expected: BOOTSTRAP_USER_ID,
        });
    }
    Ok(())
}

// SQLite turns an overflowing integer sum into a REAL, so the addition happens here.
async fn credit_achievements(
    tx: &mut Transaction<'_, Sqlite>,
    beneficiary: UserId,
    amount: Money,
) -> Result<()> {
    let current: Option<i64> = sqlx::query_scalar("SELECT achievements FROM users WHERE id = ?")
        .bind(beneficiary.get())
        .fetch_optional(&mut **tx)
        .await?;
    let achievements = Money::from_minor(current.ok_or_else(|| user_not_found(beneficiary))?)
        .checked_add(amount)
        .ok_or_else(|| StoreError::Overflow(format!("achievements of user {beneficiary}")))?;

    sqlx::query("UPDATE users SET achievements = ? WHERE id = ?")
        .bind(achievements.minor_units())
        .bind(beneficiary.get())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

// Returning early with `?` drops the open transaction, which rolls it back.
#[async_trait]
impl Store for SqliteStore {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    async fn initialize(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for statement in schema::create_statements() {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn ensure_bootstrap(&self, root: &NewUser) -> Result<bool> {
        let mut tx = self.begin_write().await?;

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *tx)
            .await?;
        if users > 0 {
            return Ok(false);
        }

        insert_bootstrap_row(&mut tx, root).await?;
        tx.commit().await?;

        tracing::info!(name = %root.name, "Bootstrap identity created");
        Ok(true)
    }

    async fn reset(&self, root: &NewUser) -> Result<()> {
        let mut tx = self.begin_write().await?;

        for statement in schema::drop_statements() {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        for statement in schema::create_statements() {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        insert_bootstrap_row(&mut tx, root).await?;

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // User Operations
    // =========================================================================

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, name, password, capabilities, balance, achievements, plan, email
             FROM users WHERE id = ?",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, name, password, capabilities, balance, achievements, plan, email
             FROM users WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, name, password, capabilities, balance, achievements, plan, email
             FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, name, password, capabilities, balance, achievements, plan, email
             FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
    }

    async fn insert_user(
        &self,
        user: &NewUser,
        credit: Option<AchievementCredit>,
    ) -> Result<UserId> {
        let mut tx = self.begin_write().await?;

        let id = insert_user_row(&mut tx, user).await?;
        if let Some(credit) = credit {
            credit_achievements(&mut tx, credit.beneficiary, credit.amount).await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    async fn delete_user(&self, id: UserId) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }
        Ok(())
    }

    async fn set_user_plan(&self, id: UserId, plan: PlanId) -> Result<()> {
        let mut tx = self.begin_write().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM plans WHERE id = ?")
            .bind(plan.get())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(plan_not_found(plan));
        }

        let result = sqlx::query("UPDATE users SET plan = ? WHERE id = ?")
            .bind(PlanId::to_column(Some(plan)))
            .bind(id.get())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn set_user_password(&self, id: UserId, password: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(password)
            .bind(id.get())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }
        Ok(())
    }

    // =========================================================================
    // Plan Operations
    // =========================================================================

    async fn get_plan(&self, id: PlanId) -> Result<Option<Plan>> {
        let row = sqlx::query_as::<_, PlanRow>("SELECT id, name, price FROM plans WHERE id = ?")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Plan::from))
    }

    async fn find_plan_by_name(&self, name: &str) -> Result<Option<Plan>> {
        let row =
            sqlx::query_as::<_, PlanRow>("SELECT id, name, price FROM plans WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Plan::from))
    }

    async fn list_plans(&self) -> Result<Vec<Plan>> {
        let rows = sqlx::query_as::<_, PlanRow>("SELECT id, name, price FROM plans ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Plan::from).collect())
    }

    async fn insert_plan(&self, name: &str, price: Money) -> Result<PlanId> {
        let result = sqlx::query("INSERT INTO plans (name, price) VALUES (?, ?)")
            .bind(name)
            .bind(price.minor_units())
            .execute(&self.pool)
            .await?;
        Ok(PlanId::new(result.last_insert_rowid()))
    }

    async fn delete_plan_if_unused(&self, id: PlanId) -> Result<()> {
        let mut tx = self.begin_write().await?;

        let plan_name: Option<String> = sqlx::query_scalar("SELECT name FROM plans WHERE id = ?")
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(plan_name) = plan_name else {
            return Err(plan_not_found(id));
        };

        let holder: Option<String> =
            sqlx::query_scalar("SELECT name FROM users WHERE plan = ? ORDER BY id LIMIT 1")
                .bind(id.get())
                .fetch_optional(&mut *tx)
                .await?;
        if let Some(user) = holder {
            return Err(StoreError::PlanInUse {
                plan: plan_name,
                user,
            });
        }

        sqlx::query("DELETE FROM plans WHERE id = ?")
            .bind(id.get())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Balance Operations
    // =========================================================================

    async fn apply_balance_update(
        &self,
        target: UserId,
        committer: UserId,
        delta: Money,
    ) -> Result<BalanceUpdate> {
        let mut tx = self.begin_write().await?;

        let current: Option<i64> = sqlx::query_scalar("SELECT balance FROM users WHERE id = ?")
            .bind(target.get())
            .fetch_optional(&mut *tx)
            .await?;
        let old_balance = Money::from_minor(current.ok_or_else(|| user_not_found(target))?);
        let new_balance = old_balance
            .checked_add(delta)
            .ok_or_else(|| StoreError::Overflow(format!("balance of user {target}")))?;

        sqlx::query("UPDATE users SET balance = ? WHERE id = ?")
            .bind(new_balance.minor_units())
            .bind(target.get())
            .execute(&mut *tx)
            .await?;

        if delta.is_positive() {
            credit_achievements(&mut tx, committer, delta).await?;
        }

        let description = BalanceEvent::describe(delta, old_balance, new_balance, committer);
        let created_at = Utc::now();
        let inserted = sqlx::query(
            "INSERT INTO balance_events (user_id, description, created_at) VALUES (?, ?, ?)",
        )
        .bind(target.get())
        .bind(&description)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(BalanceUpdate {
            old_balance,
            new_balance,
            event: BalanceEvent {
                id: EventId::new(inserted.last_insert_rowid()),
                user_id: target,
                description,
                created_at,
            },
        })
    }

    async fn list_balance_events(&self, user: UserId) -> Result<Vec<BalanceEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT id, user_id, description, created_at
             FROM balance_events WHERE user_id = ? ORDER BY id",
        )
        .bind(user.get())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(BalanceEvent::from).collect())
    }
}
