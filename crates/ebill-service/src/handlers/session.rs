//! Login and logout.

use std::sync::Arc;

use axum::extract::State;
use axum::Form;
use serde::Deserialize;

use crate::auth::AuthSession;
use crate::error::ApiError;
use crate::handlers::OK;
use crate::state::AppState;

/// Login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// User name.
    pub name: String,
    /// Salted password hash.
    pub password: String,
}

/// Open a session. Responds with `token=<token>`.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<String, ApiError> {
    let token = state.sessions.login(&form.name, &form.password).await?;
    Ok(format!("token={token}"))
}

/// Close the caller's session.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    auth: AuthSession,
) -> Result<&'static str, ApiError> {
    state.sessions.logout(&auth.token).await?;
    Ok(OK)
}
