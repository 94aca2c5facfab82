//! User management integration tests.

mod common;

use axum::http::StatusCode;
use common::{bearer, TestHarness};

use ebill_core::{BillingError, Capability, BOOTSTRAP_USER_ID};

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn root_creates_customer_and_earns_reward() {
    let harness = TestHarness::new().await;
    let root = harness.root_token().await;

    let response = bearer(harness.server.post("/v1/users"), &root)
        .form(&[
            ("name", "alice"),
            ("password", "alice-hash"),
            ("permissions", "customer"),
            ("email", "alice@example.com"),
        ])
        .await;

    response.assert_status_ok();
    assert_eq!(response.text(), "uid=2");

    let root_info = bearer(harness.server.get("/v1/users/root"), &root).await;
    assert!(root_info.text().contains("&achi=10.00&"));
}

#[tokio::test]
async fn staff_creation_does_not_earn_reward() {
    let harness = TestHarness::new().await;
    harness.add_user("carol", "cashier").await;

    let root = harness.store.get_user(BOOTSTRAP_USER_ID).await.unwrap().unwrap();
    assert_eq!(root.achievements.encode(), "0.00");
}

#[tokio::test]
async fn service_agent_creates_customers_only() {
    let harness = TestHarness::new().await;
    let sam = harness.user_token("sam", "customer-service").await;

    let customer = bearer(harness.server.post("/v1/users"), &sam)
        .form(&[
            ("name", "alice"),
            ("password", "h"),
            ("permissions", "customer"),
            ("email", "alice@example.com"),
        ])
        .await;
    customer.assert_status_ok();

    let staff = bearer(harness.server.post("/v1/users"), &sam)
        .form(&[
            ("name", "mallory"),
            ("password", "h"),
            ("permissions", "cashier"),
            ("email", "mallory@example.com"),
        ])
        .await;
    staff.assert_status(StatusCode::FORBIDDEN);

    let sam_record = harness.store.find_user_by_name("sam").await.unwrap().unwrap();
    assert_eq!(sam_record.achievements.encode(), "10.00");
    assert!(harness.store.find_user_by_name("mallory").await.unwrap().is_none());
}

#[tokio::test]
async fn admin_without_service_cannot_create_customers() {
    let harness = TestHarness::new().await;
    let ada = harness.user_token("ada", "admin").await;

    bearer(harness.server.post("/v1/users"), &ada)
        .form(&[
            ("name", "alice"),
            ("password", "h"),
            ("permissions", "customer"),
            ("email", "alice@example.com"),
        ])
        .await
        .assert_status(StatusCode::FORBIDDEN);

    bearer(harness.server.post("/v1/users"), &ada)
        .form(&[
            ("name", "carol"),
            ("password", "h"),
            ("permissions", "cashier"),
            ("email", "carol@example.com"),
        ])
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn create_rejects_bad_input() {
    let harness = TestHarness::new().await;
    let root = harness.root_token().await;

    let cases = [
        ("bad'name", "customer", "x@example.com"),
        ("alice", "customer,wizard", "x@example.com"),
        ("alice", "customer", "not-an-email"),
    ];
    for (name, permissions, email) in cases {
        bearer(harness.server.post("/v1/users"), &root)
            .form(&[
                ("name", name),
                ("password", "h"),
                ("permissions", permissions),
                ("email", email),
            ])
            .await
            .assert_status_bad_request();
    }
}

#[tokio::test]
async fn duplicate_name_or_email_conflicts() {
    let harness = TestHarness::new().await;
    harness.add_user("alice", "customer").await;
    let root = harness.root_token().await;

    for (name, email) in [("alice", "other@example.com"), ("bob", "alice@example.com")] {
        bearer(harness.server.post("/v1/users"), &root)
            .form(&[
                ("name", name),
                ("password", "h"),
                ("permissions", "customer"),
                ("email", email),
            ])
            .await
            .assert_status(StatusCode::CONFLICT);
    }
}

#[tokio::test]
async fn failed_reward_leaves_no_user_behind() {
    let harness = TestHarness::new().await;

    // The bootstrap identity is authorized without a row, so the insert runs and the
    // reward credit is what fails.
    harness.store.delete_user(BOOTSTRAP_USER_ID).await.unwrap();

    let result = harness
        .state
        .ledger
        .add_user(BOOTSTRAP_USER_ID, "alice", "h", "customer", "alice@example.com")
        .await;

    assert!(matches!(result, Err(BillingError::NotFound { .. })));
    assert!(harness.store.find_user_by_name("alice").await.unwrap().is_none());
}

// ============================================================================
// Query
// ============================================================================

#[tokio::test]
async fn query_user_info_record() {
    let harness = TestHarness::new().await;
    let alice = harness.user_token("alice", "customer").await;

    let response = bearer(harness.server.get("/v1/users/alice"), &alice).await;

    response.assert_status_ok();
    assert_eq!(
        response.text(),
        "name=alice&permission=customer,public&balance=0.00&achi=0.00&plan_name=&plan_price=0.00"
    );
}

#[tokio::test]
async fn cross_queries_need_customer_service() {
    let harness = TestHarness::new().await;
    let alice = harness.user_token("alice", "customer").await;
    harness.add_user("bob", "customer").await;
    let sam = harness.user_token("sam", "customer-service").await;

    bearer(harness.server.get("/v1/users/bob"), &alice)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    bearer(harness.server.get("/v1/users/bob/balance-log"), &alice)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    bearer(harness.server.get("/v1/users/bob"), &sam)
        .await
        .assert_status_ok();
    bearer(harness.server.get("/v1/users/ghost"), &sam)
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn list_users_requires_customer_service() {
    let harness = TestHarness::new().await;
    let alice = harness.user_token("alice", "customer").await;
    let root = harness.root_token().await;

    bearer(harness.server.get("/v1/users"), &alice)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = bearer(harness.server.get("/v1/users"), &root).await;
    response.assert_status_ok();

    let text = response.text();
    let lines: Vec<_> = text.split('\n').collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with(
        "name=root&permission=admin,cashier,customer-service,customer,public&"
    ));
    assert!(lines[1].starts_with("name=alice&"));
    assert!(!text.ends_with('\n'));
}

// ============================================================================
// Remove
// ============================================================================

#[tokio::test]
async fn remove_user_revokes_sessions() {
    let harness = TestHarness::new().await;
    let alice = harness.user_token("alice", "customer").await;
    let sam = harness.user_token("sam", "customer-service").await;

    let response = bearer(harness.server.delete("/v1/users/alice"), &sam).await;
    response.assert_status_ok();

    assert!(harness.store.find_user_by_name("alice").await.unwrap().is_none());
    bearer(harness.server.get("/v1/users/alice"), &alice)
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn remove_user_rules() {
    let harness = TestHarness::new().await;
    harness.add_user("carol", "cashier").await;
    let sam = harness.user_token("sam", "customer-service").await;
    let root = harness.root_token().await;

    // Staff targets need admin.
    bearer(harness.server.delete("/v1/users/carol"), &sam)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    bearer(harness.server.delete("/v1/users/ghost"), &sam)
        .await
        .assert_status_not_found();

    // The bootstrap identity stays.
    bearer(harness.server.delete("/v1/users/root"), &root)
        .await
        .assert_status(StatusCode::CONFLICT);

    bearer(harness.server.delete("/v1/users/carol"), &root)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn bootstrap_holds_every_capability() {
    let harness = TestHarness::new().await;
    let permissions = harness.state.ledger.permissions();

    for capability in Capability::ALL {
        assert!(permissions.has_capability(BOOTSTRAP_USER_ID, capability).await);
    }
    assert!(!permissions
        .has_capability(harness.add_user("alice", "customer").await, Capability::Cashier)
        .await);
}
