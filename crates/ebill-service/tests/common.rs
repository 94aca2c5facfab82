//! Common test utilities for ebill integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderValue;
use axum_test::{TestRequest, TestServer};

use ebill_core::UserId;
use ebill_service::{create_router, AppState, MailError, Mailer, ServiceConfig};
use ebill_store::{SqliteStore, Store};

/// Credential the bootstrap identity is created with.
pub const ROOT_PASSWORD: &str = "root-hash";

/// A mail captured by [`RecordingMailer`].
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mailer that records instead of sending.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(SentMail {
            to: address.into(),
            subject: subject.into(),
            body: body.into(),
        });
        Ok(())
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Shared state, for driving the engine directly.
    pub state: AppState,
    /// The storage backend behind the state.
    pub store: Arc<dyn Store>,
    /// Captured mail.
    pub mailer: Arc<RecordingMailer>,
}

impl TestHarness {
    /// Create a new test harness with a fresh in-memory database and a bootstrap identity.
    pub async fn new() -> Self {
        let store = SqliteStore::in_memory()
            .await
            .expect("Failed to open store");
        store.initialize().await.expect("Failed to create schema");
        let store: Arc<dyn Store> = Arc::new(store);

        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::with_mailer(
            Arc::clone(&store),
            ServiceConfig::default(),
            Some(Arc::clone(&mailer) as Arc<dyn Mailer>),
        );

        store
            .ensure_bootstrap(&state.ledger.bootstrap_user(ROOT_PASSWORD))
            .await
            .expect("Failed to create bootstrap identity");

        let server =
            TestServer::new(create_router(state.clone())).expect("Failed to create test server");

        Self {
            server,
            state,
            store,
            mailer,
        }
    }

    /// Log in over HTTP and return the token.
    pub async fn login(&self, name: &str, password: &str) -> String {
        let response = self
            .server
            .post("/v1/session/login")
            .form(&[("name", name), ("password", password)])
            .await;
        response.assert_status_ok();

        response
            .text()
            .strip_prefix("token=")
            .expect("login response carries a token")
            .to_string()
    }

    /// Log in as the bootstrap identity.
    pub async fn root_token(&self) -> String {
        self.login("root", ROOT_PASSWORD).await
    }

    /// Create a user directly through the ledger, committed by the bootstrap identity.
    pub async fn add_user(&self, name: &str, permissions: &str) -> UserId {
        self.state
            .ledger
            .add_user(
                ebill_core::BOOTSTRAP_USER_ID,
                name,
                &password_for(name),
                permissions,
                &format!("{name}@example.com"),
            )
            .await
            .expect("Failed to add user")
    }

    /// Create a user and log it in.
    pub async fn user_token(&self, name: &str, permissions: &str) -> String {
        self.add_user(name, permissions).await;
        self.login(name, &password_for(name)).await
    }

    /// Wait for queued mail to be delivered.
    pub async fn drain_mail(&self) {
        self.state
            .notifications
            .shutdown(Duration::from_secs(5))
            .await;
    }
}

/// The credential [`TestHarness::add_user`] gives `name`.
pub fn password_for(name: &str) -> String {
    format!("{name}-hash")
}

/// Attach a bearer token to a request.
pub fn bearer(request: TestRequest, token: &str) -> TestRequest {
    let value = HeaderValue::from_str(&format!("Bearer {token}")).expect("valid header");
    request.add_header(AUTHORIZATION, value)
}
