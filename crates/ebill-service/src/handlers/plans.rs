//! Plan handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Form;
use serde::Deserialize;

use crate::auth::AuthSession;
use crate::error::ApiError;
use crate::handlers::OK;
use crate::state::AppState;

/// Create-plan form.
#[derive(Debug, Deserialize)]
pub struct CreatePlanForm {
    /// Unique plan name.
    pub name: String,
    /// Decimal price, e.g. `49.99`.
    pub price: String,
}

/// List every plan.
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
    auth: AuthSession,
) -> Result<String, ApiError> {
    let listing = state.ledger.list_all_plan_info(auth.user_id).await?;
    Ok(listing.to_string())
}

/// Create a plan. Responds with `pid=<id>`.
pub async fn create_plan(
    State(state): State<Arc<AppState>>,
    auth: AuthSession,
    Form(form): Form<CreatePlanForm>,
) -> Result<String, ApiError> {
    let id = state
        .ledger
        .add_plan(auth.user_id, &form.name, &form.price)
        .await?;
    Ok(format!("pid={id}"))
}

/// Delete an unused plan.
pub async fn delete_plan(
    State(state): State<Arc<AppState>>,
    auth: AuthSession,
    Path(name): Path<String>,
) -> Result<&'static str, ApiError> {
    state.ledger.remove_plan(auth.user_id, &name).await?;
    Ok(OK)
}
