//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, health, password, plans, session, users};
use crate::state::AppState;

/// Maximum concurrent requests for API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 64;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /v1/session/login` - Open a session
/// - `POST /v1/password/change` - Change a password with the old credential
/// - `POST /v1/password/forget` - Mail a reset link
///
/// ## Session (Bearer token)
/// - `POST /v1/session/logout` - Close the caller's session
///
/// ## Users (Bearer token)
/// - `GET /v1/users` - List users
/// - `POST /v1/users` - Create a user
/// - `GET /v1/users/:name` - Get a user
/// - `DELETE /v1/users/:name` - Delete a user
/// - `GET /v1/users/:name/balance-log` - List balance events
/// - `POST /v1/users/:name/plan` - Assign a plan
/// - `POST /v1/users/:name/balance` - Apply a balance delta
///
/// ## Plans (Bearer token)
/// - `GET /v1/plans` - List plans
/// - `POST /v1/plans` - Create a plan
/// - `DELETE /v1/plans/:name` - Delete an unused plan
///
/// ## Admin (Bearer token)
/// - `POST /v1/admin/reset` - Reset the database
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let api_routes = Router::new()
        // Sessions
        .route("/session/login", post(session::login))
        .route("/session/logout", post(session::logout))
        // Passwords
        .route("/password/change", post(password::change_password))
        .route("/password/forget", post(password::forget_password))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:name",
            get(users::get_user).delete(users::delete_user),
        )
        .route("/users/:name/balance-log", get(users::balance_log))
        .route("/users/:name/plan", post(users::update_plan))
        .route("/users/:name/balance", post(users::update_balance))
        // Plans
        .route("/plans", get(plans::list_plans).post(plans::create_plan))
        .route("/plans/:name", delete(plans::delete_plan))
        // Admin
        .route("/admin/reset", post(admin::reset_database))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
