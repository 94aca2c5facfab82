//! Session tokens.
//!
//! The [`SessionManager`] maps opaque bearer tokens to identities for the life of the
//! process. It is owned by the service state and shared behind an `Arc`; the map itself
//! is guarded by an async `RwLock`, so concurrent logins and logouts are serialized.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use rand::RngCore;
use tokio::sync::RwLock;

use ebill_core::credentials::constant_time_eq;
use ebill_core::validation::check_name;
use ebill_core::{BillingError, Result, UserId};
use ebill_store::Store;

// ============================================================================
// Constants
// ============================================================================

/// Random bytes per token. Tokens are hex-encoded, so twice this many characters.
pub const TOKEN_BYTES: usize = 32;

/// Token generation attempts per login before giving up.
pub const MAX_TOKEN_ATTEMPTS: u32 = 8;

/// Source of candidate session tokens.
pub trait TokenGenerator: Send + Sync {
    /// Produce a candidate token. Uniqueness is checked by the caller.
    fn generate(&self) -> String;
}

/// Generates tokens from the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

/// Process-wide session registry.
pub struct SessionManager {
    store: Arc<dyn Store>,
    tokens: RwLock<HashMap<String, UserId>>,
    generator: Box<dyn TokenGenerator>,
}

impl SessionManager {
    /// Create a session manager issuing random tokens.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_generator(store, RandomTokenGenerator)
    }

    /// Create a session manager with a custom token source.
    #[must_use]
    pub fn with_generator(store: Arc<dyn Store>, generator: impl TokenGenerator + 'static) -> Self {
        Self {
            store,
            tokens: RwLock::new(HashMap::new()),
            generator: Box::new(generator),
        }
    }

    /// Authenticate by name and credential and open a session.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` if the name fails validation.
    /// - `NotFound` if no user has that name.
    /// - `PermissionDenied` if the credential does not match.
    /// - `TokenExhausted` if no unused token turned up within [`MAX_TOKEN_ATTEMPTS`].
    pub async fn login(&self, name: &str, password: &str) -> Result<String> {
        check_name("name", name)?;

        let user = self
            .store
            .find_user_by_name(name)
            .await?
            .ok_or_else(|| BillingError::not_found("user", name))?;

        if !constant_time_eq(password, &user.password) {
            tracing::warn!(user = %name, "Login rejected: credential mismatch");
            return Err(BillingError::denied("invalid credentials"));
        }

        let mut tokens = self.tokens.write().await;
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            if let Entry::Vacant(slot) = tokens.entry(self.generator.generate()) {
                let token = slot.key().clone();
                slot.insert(user.id);
                tracing::info!(user_id = %user.id, "Session opened");
                return Ok(token);
            }
        }

        tracing::error!(user_id = %user.id, "Session token generation exhausted");
        Err(BillingError::TokenExhausted {
            attempts: MAX_TOKEN_ATTEMPTS,
        })
    }

    /// Close a session, returning the identity it belonged to.
    ///
    /// Not idempotent: a second logout with the same token fails.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the token is not registered.
    pub async fn logout(&self, token: &str) -> Result<UserId> {
        let user_id = self
            .tokens
            .write()
            .await
            .remove(token)
            .ok_or(BillingError::InvalidToken)?;

        tracing::info!(user_id = %user_id, "Session closed");
        Ok(user_id)
    }

    /// Resolve a token to its identity.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the token is not registered.
    pub async fn verify(&self, token: &str) -> Result<UserId> {
        self.tokens
            .read()
            .await
            .get(token)
            .copied()
            .ok_or(BillingError::InvalidToken)
    }

    /// Drop every session held by `user`. Returns how many were dropped.
    pub async fn revoke_identity(&self, user: UserId) -> usize {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, owner| *owner != user);
        let revoked = before - tokens.len();

        if revoked > 0 {
            tracing::info!(user_id = %user, revoked, "Sessions revoked");
        }
        revoked
    }

    /// Drop every session. Returns how many were dropped.
    pub async fn revoke_all(&self) -> usize {
        let mut tokens = self.tokens.write().await;
        let revoked = tokens.len();
        tokens.clear();
        revoked
    }

    /// Number of open sessions.
    pub async fn active_sessions(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Tear down the registry at process exit.
    pub async fn shutdown(&self) {
        let revoked = self.revoke_all().await;
        tracing::info!(revoked, "Session manager shut down");
    }
}
