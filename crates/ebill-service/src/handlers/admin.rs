//! Administrative handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Form;
use serde::Deserialize;

use crate::auth::AuthSession;
use crate::error::ApiError;
use crate::handlers::OK;
use crate::state::AppState;

/// Reset form.
#[derive(Debug, Deserialize)]
pub struct ResetForm {
    /// Salted password hash for the new bootstrap identity.
    pub password: String,
}

/// Drop all data and recreate the bootstrap identity. Every session, including the
/// caller's, is closed.
pub async fn reset_database(
    State(state): State<Arc<AppState>>,
    auth: AuthSession,
    Form(form): Form<ResetForm>,
) -> Result<&'static str, ApiError> {
    state
        .ledger
        .reset_database(auth.user_id, &form.password)
        .await?;
    Ok(OK)
}
