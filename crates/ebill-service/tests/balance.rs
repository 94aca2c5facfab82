//! Balance update integration tests.

mod common;

use axum::http::StatusCode;
use common::{bearer, TestHarness};

use ebill_core::{BillingError, Money};

#[tokio::test]
async fn balance_update_commits_balance_reward_and_event() {
    let harness = TestHarness::new().await;
    let alice = harness.add_user("alice", "customer").await;
    let carol = harness.add_user("carol", "cashier").await;
    let ledger = &harness.state.ledger;

    ledger.update_user_balance(carol, "alice", "10.00").await.unwrap();
    let achievements_before = harness.store.get_user(carol).await.unwrap().unwrap().achievements;
    let events_before = harness.store.list_balance_events(alice).await.unwrap().len();

    let update = ledger.update_user_balance(carol, "alice", "5.00").await.unwrap();

    assert_eq!(update.old_balance, Money::from_minor(1000));
    assert_eq!(update.new_balance, Money::from_minor(1500));

    let alice_record = harness.store.get_user(alice).await.unwrap().unwrap();
    assert_eq!(alice_record.balance, Money::from_minor(1500));

    let carol_record = harness.store.get_user(carol).await.unwrap().unwrap();
    assert_eq!(
        carol_record.achievements.minor_units() - achievements_before.minor_units(),
        500
    );

    let events = harness.store.list_balance_events(alice).await.unwrap();
    assert_eq!(events.len(), events_before + 1);
    let description = &events.last().unwrap().description;
    for fragment in ["5.00", "10.00", "15.00"] {
        assert!(description.contains(fragment), "{description} lacks {fragment}");
    }
    assert_eq!(
        description,
        &format!("balance_update 5.00 from 10.00 to 15.00 by {carol}")
    );
}

#[tokio::test]
async fn negative_delta_does_not_reward() {
    let harness = TestHarness::new().await;
    let alice = harness.add_user("alice", "customer").await;
    let carol = harness.add_user("carol", "cashier").await;

    harness
        .state
        .ledger
        .update_user_balance(carol, "alice", "-2.50")
        .await
        .unwrap();

    let alice_record = harness.store.get_user(alice).await.unwrap().unwrap();
    assert_eq!(alice_record.balance.encode(), "-2.50");
    let carol_record = harness.store.get_user(carol).await.unwrap().unwrap();
    assert_eq!(carol_record.achievements, Money::ZERO);
}

#[tokio::test]
async fn balance_update_over_http() {
    let harness = TestHarness::new().await;
    let alice = harness.user_token("alice", "customer").await;
    let carol = harness.user_token("carol", "cashier").await;

    let response = bearer(harness.server.post("/v1/users/alice/balance"), &carol)
        .form(&[("delta", "12.345")])
        .await;
    response.assert_status_ok();
    assert_eq!(response.text(), "ok");

    // Customers may read their own log.
    let log = bearer(harness.server.get("/v1/users/alice/balance-log"), &alice).await;
    log.assert_status_ok();
    assert_eq!(
        log.text(),
        "events=balance_update 12.34 from 0.00 to 12.34 by 3"
    );
}

#[tokio::test]
async fn empty_balance_log() {
    let harness = TestHarness::new().await;
    let alice = harness.user_token("alice", "customer").await;

    let log = bearer(harness.server.get("/v1/users/alice/balance-log"), &alice).await;
    log.assert_status_ok();
    assert_eq!(log.text(), "events=");
}

#[tokio::test]
async fn balance_update_rejections() {
    let harness = TestHarness::new().await;
    harness.add_user("alice", "customer").await;
    harness.add_user("sam", "customer-service").await;
    let carol = harness.user_token("carol", "cashier").await;
    let sam = harness.login("sam", "sam-hash").await;

    // Committer lacks cashier.
    bearer(harness.server.post("/v1/users/alice/balance"), &sam)
        .form(&[("delta", "1.00")])
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // Target is not a customer.
    bearer(harness.server.post("/v1/users/sam/balance"), &carol)
        .form(&[("delta", "1.00")])
        .await
        .assert_status(StatusCode::FORBIDDEN);

    bearer(harness.server.post("/v1/users/alice/balance"), &carol)
        .form(&[("delta", "one")])
        .await
        .assert_status_bad_request();

    bearer(harness.server.post("/v1/users/ghost/balance"), &carol)
        .form(&[("delta", "1.00")])
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn rejected_update_writes_nothing() {
    let harness = TestHarness::new().await;
    let alice = harness.add_user("alice", "customer").await;
    let bob = harness.add_user("bob", "customer").await;

    let result = harness
        .state
        .ledger
        .update_user_balance(bob, "alice", "100.00")
        .await;

    assert!(matches!(result, Err(BillingError::PermissionDenied { .. })));
    let alice_record = harness.store.get_user(alice).await.unwrap().unwrap();
    assert_eq!(alice_record.balance, Money::ZERO);
    assert!(harness.store.list_balance_events(alice).await.unwrap().is_empty());
}
