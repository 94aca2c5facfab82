//! Password change and reset mail.

use std::sync::Arc;

use ebill_core::credentials::constant_time_eq;
use ebill_core::validation::{check_email, check_link_target, check_name};
use ebill_core::{BillingError, Result, User};
use ebill_store::Store;

use crate::notify::NotificationTasks;
use crate::session::SessionManager;

/// Credential self-service: change a password, or mail a reset link.
pub struct PasswordRecovery {
    store: Arc<dyn Store>,
    sessions: Arc<SessionManager>,
    notifications: Arc<NotificationTasks>,
    product_name: String,
}

impl PasswordRecovery {
    /// Create the recovery service. `product_name` signs the reset mail.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        sessions: Arc<SessionManager>,
        notifications: Arc<NotificationTasks>,
        product_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            sessions,
            notifications,
            product_name: product_name.into(),
        }
    }

    /// Replace a credential after checking the old one, then revoke the user's sessions.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` for a bad name or an empty new credential.
    /// - `NotFound` if no user has that name.
    /// - `PermissionDenied` if the old credential does not match.
    pub async fn change_password(&self, name: &str, old: &str, new: &str) -> Result<()> {
        check_name("name", name)?;
        if new.is_empty() {
            return Err(BillingError::invalid_format("password", new));
        }

        let user = self
            .store
            .find_user_by_name(name)
            .await?
            .ok_or_else(|| BillingError::not_found("user", name))?;

        if !constant_time_eq(old, &user.password) {
            tracing::warn!(user_id = %user.id, "Password change rejected: credential mismatch");
            return Err(BillingError::denied("invalid old password"));
        }

        self.store.set_user_password(user.id, new).await?;
        self.sessions.revoke_identity(user.id).await;

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    /// Mail a reset link to the owner of `email`.
    ///
    /// Returns once the send is queued; delivery failures are only logged.
    ///
    /// # Errors
    ///
    /// - `InvalidFormat` for a bad email, domain or protocol.
    /// - `NotFound` if no user has that email.
    pub async fn forget_password(&self, email: &str, domain: &str, proto: &str) -> Result<()> {
        check_email(email)?;

        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| BillingError::not_found("email", email))?;

        check_link_target(domain, proto)?;

        let subject = format!("{} password reset", self.product_name);
        let body = reset_message(&user, domain, proto, &self.product_name);
        self.notifications.dispatch(email, &subject, body);

        tracing::info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }
}

/// Compose the reset mail body.
///
/// The link carries the current credential as `old`, which the change-password form
/// submits back unchanged.
fn reset_message(user: &User, domain: &str, proto: &str, product_name: &str) -> String {
    format!(
        "Your username is {name}. Use the following link to reset your password:\n \
         {proto}//{domain}/changePassword.html?old={old}&name={name}\n\n{product_name}",
        name = user.name,
        old = user.password,
    )
}
