//! Bearer-token authentication.
//!
//! Authenticated routes take an [`AuthSession`] argument; the extractor resolves the
//! `Authorization: Bearer <token>` header through the session manager.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use ebill_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// The identity the token belongs to.
    pub user_id: UserId,
    /// The raw token, for logout.
    pub token: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        let user_id = state.sessions.verify(token).await.map_err(|_| {
            tracing::debug!("Rejected unknown session token");
            ApiError::Unauthorized
        })?;

        Ok(Self {
            user_id,
            token: token.to_string(),
        })
    }
}
