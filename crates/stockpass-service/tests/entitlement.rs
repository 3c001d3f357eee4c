//! Entitlement and analysis-authorization integration tests.

mod common;

use axum::http::StatusCode;
use common::{TestHarness, ADMIN_KEY};
use serde_json::json;

async fn authorize(harness: &TestHarness, token: &str) -> axum_test::TestResponse {
    harness
        .server
        .post("/v1/analysis/authorize")
        .add_header("authorization", format!("Bearer {token}"))
        .await
}

// ============================================================================
// Entitlement check
// ============================================================================

#[tokio::test]
async fn entitlement_reflects_expiry() {
    let harness = TestHarness::new();
    let token = harness.register("alice").await;

    let response = harness
        .server
        .get("/v1/entitlement")
        .add_header("authorization", format!("Bearer {token}"))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["is_vip"], false);

    let code = harness.generate_invite(30).await;
    harness
        .server
        .post("/v1/invites/redeem")
        .add_header("authorization", format!("Bearer {token}"))
        .json(&json!({ "code": code }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/v1/entitlement")
        .add_header("authorization", format!("Bearer {token}"))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["is_vip"], true);
}

// ============================================================================
// Analysis authorization
// ============================================================================

#[tokio::test]
async fn lapsed_account_is_refused_with_subscription_expired() {
    let harness = TestHarness::new();
    let token = harness.register("alice").await;

    let response = authorize(&harness, &token).await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "subscription_expired");
}

#[tokio::test]
async fn entitled_account_is_granted_with_remaining() {
    let harness = TestHarness::with_analysis_limit(5);
    let token = harness.register("alice").await;
    let code = harness.generate_invite(30).await;
    harness
        .server
        .post("/v1/invites/redeem")
        .add_header("authorization", format!("Bearer {token}"))
        .json(&json!({ "code": code }))
        .await
        .assert_status_ok();

    let response = authorize(&harness, &token).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["allowed"], true);
    assert_eq!(body["remaining"], 4);
}

#[tokio::test]
async fn quota_exhaustion_returns_429_with_resume_at() {
    let harness = TestHarness::with_analysis_limit(3);
    let token = harness.register("alice").await;
    let code = harness.generate_invite(30).await;
    harness
        .server
        .post("/v1/invites/redeem")
        .add_header("authorization", format!("Bearer {token}"))
        .json(&json!({ "code": code }))
        .await
        .assert_status_ok();

    for expected_remaining in [2, 1, 0] {
        let response = authorize(&harness, &token).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["remaining"], expected_remaining);
    }

    let response = authorize(&harness, &token).await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "rate_limited");
    assert!(body["error"]["details"]["resume_at"].as_str().is_some());
}

#[tokio::test]
async fn quotas_are_per_account() {
    let harness = TestHarness::with_analysis_limit(1);
    let alice = harness.register("alice").await;
    let bob = harness.register("bob").await;

    for token in [&alice, &bob] {
        let code = harness.generate_invite(30).await;
        harness
            .server
            .post("/v1/invites/redeem")
            .add_header("authorization", format!("Bearer {token}"))
            .json(&json!({ "code": code }))
            .await
            .assert_status_ok();
    }

    authorize(&harness, &alice).await.assert_status_ok();
    authorize(&harness, &alice)
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    // Alice exhausting her window leaves Bob's untouched.
    authorize(&harness, &bob).await.assert_status_ok();
}

#[tokio::test]
async fn refusals_do_not_consume_quota() {
    let harness = TestHarness::with_analysis_limit(2);
    let token = harness.register("alice").await;

    // Hammer the endpoint while lapsed; every call is refused at the
    // entitlement gate, before the limiter.
    for _ in 0..5 {
        authorize(&harness, &token)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    let code = harness.generate_invite(30).await;
    harness
        .server
        .post("/v1/invites/redeem")
        .add_header("authorization", format!("Bearer {token}"))
        .json(&json!({ "code": code }))
        .await
        .assert_status_ok();

    // The full window is still available.
    let response = authorize(&harness, &token).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["remaining"], 1);
}

#[tokio::test]
async fn disabled_account_is_refused() {
    let harness = TestHarness::new();
    let token = harness.register("alice").await;
    let code = harness.generate_invite(30).await;
    harness
        .server
        .post("/v1/invites/redeem")
        .add_header("authorization", format!("Bearer {token}"))
        .json(&json!({ "code": code }))
        .await
        .assert_status_ok();

    let me = harness.me(&token).await;
    let id = me["id"].as_str().unwrap();
    harness
        .server
        .put(&format!("/v1/admin/users/{id}"))
        .add_header("x-admin-key", ADMIN_KEY)
        .json(&json!({ "is_active": false }))
        .await
        .assert_status_ok();

    let response = authorize(&harness, &token).await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "account_disabled");
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn health_is_public() {
    let harness = TestHarness::new();

    let response = harness.server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "stockpass");
}
