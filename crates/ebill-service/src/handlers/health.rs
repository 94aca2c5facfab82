//! Liveness and store reachability.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health report.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// `ok`, or `degraded` when the store does not answer.
    pub status: &'static str,
    /// `reachable` or `unreachable`.
    pub store: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Crate version.
    pub version: &'static str,
}

/// Report whether the service can reach its store. Responds 503 when it cannot.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthReport>) {
    let (code, status, store) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ok", "reachable"),
        Err(e) => {
            tracing::warn!(error = %e, "Health check: store unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unreachable")
        }
    };

    (
        code,
        Json(HealthReport {
            status,
            store,
            service: "ebill",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
