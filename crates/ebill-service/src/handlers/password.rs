//! Password change and reset handlers. Neither requires a session.

use std::sync::Arc;

use axum::extract::State;
use axum::Form;
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::OK;
use crate::state::AppState;

/// Change-password form.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordForm {
    /// User name.
    pub name: String,
    /// Current salted password hash.
    pub old: String,
    /// New salted password hash.
    pub new: String,
}

/// Replace a credential.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ChangePasswordForm>,
) -> Result<&'static str, ApiError> {
    state
        .recovery
        .change_password(&form.name, &form.old, &form.new)
        .await?;
    Ok(OK)
}

/// Forget-password form.
#[derive(Debug, Deserialize)]
pub struct ForgetPasswordForm {
    /// Address the account was registered with.
    pub email: String,
    /// Host (and optional port) the reset link points at.
    pub domain: String,
    /// Link protocol, `http:` or `https:`.
    pub proto: String,
}

/// Mail a reset link. Responds as soon as the send is queued.
pub async fn forget_password(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ForgetPasswordForm>,
) -> Result<&'static str, ApiError> {
    state
        .recovery
        .forget_password(&form.email, &form.domain, &form.proto)
        .await?;
    Ok(OK)
}
