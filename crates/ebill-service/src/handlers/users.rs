//! User management handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Form;
use serde::Deserialize;

use crate::auth::AuthSession;
use crate::error::ApiError;
use crate::handlers::OK;
use crate::state::AppState;

/// Create-user form.
#[derive(Debug, Deserialize)]
pub struct CreateUserForm {
    /// Unique user name.
    pub name: String,
    /// Salted password hash.
    pub password: String,
    /// Comma-separated capability names.
    pub permissions: String,
    /// Unique contact address.
    pub email: String,
}

/// Create a user. Responds with `uid=<id>`.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    auth: AuthSession,
    Form(form): Form<CreateUserForm>,
) -> Result<String, ApiError> {
    let id = state
        .ledger
        .add_user(
            auth.user_id,
            &form.name,
            &form.password,
            &form.permissions,
            &form.email,
        )
        .await?;
    Ok(format!("uid={id}"))
}

/// List every user.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    auth: AuthSession,
) -> Result<String, ApiError> {
    let listing = state.ledger.list_all_user_info(auth.user_id).await?;
    Ok(listing.to_string())
}

/// Get one user.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    auth: AuthSession,
    Path(name): Path<String>,
) -> Result<String, ApiError> {
    let info = state.ledger.query_user_info(auth.user_id, &name).await?;
    Ok(info.to_string())
}

/// Delete a user.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth: AuthSession,
    Path(name): Path<String>,
) -> Result<&'static str, ApiError> {
    state.ledger.remove_user(auth.user_id, &name).await?;
    Ok(OK)
}

/// Get a user's balance events.
pub async fn balance_log(
    State(state): State<Arc<AppState>>,
    auth: AuthSession,
    Path(name): Path<String>,
) -> Result<String, ApiError> {
    let log = state.ledger.query_balance_log(auth.user_id, &name).await?;
    Ok(log.to_string())
}

/// Plan assignment form.
#[derive(Debug, Deserialize)]
pub struct UpdatePlanForm {
    /// Name of the plan to assign.
    pub plan: String,
}

/// Assign a plan to a customer.
pub async fn update_plan(
    State(state): State<Arc<AppState>>,
    auth: AuthSession,
    Path(name): Path<String>,
    Form(form): Form<UpdatePlanForm>,
) -> Result<&'static str, ApiError> {
    state
        .ledger
        .update_user_plan(auth.user_id, &name, &form.plan)
        .await?;
    Ok(OK)
}

/// Balance update form.
#[derive(Debug, Deserialize)]
pub struct UpdateBalanceForm {
    /// Signed decimal amount, e.g. `5.00` or `-1.25`.
    pub delta: String,
}

/// Apply a balance delta to a customer.
pub async fn update_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthSession,
    Path(name): Path<String>,
    Form(form): Form<UpdateBalanceForm>,
) -> Result<&'static str, ApiError> {
    state
        .ledger
        .update_user_balance(auth.user_id, &name, &form.delta)
        .await?;
    Ok(OK)
}
