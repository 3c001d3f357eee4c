//! Account registration, login, and profile integration tests.

mod common;

use common::{TestHarness, ADMIN_KEY};
use axum::http::StatusCode;
use serde_json::json;

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn register_creates_lapsed_account() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/accounts/register")
        .json(&json!({ "name": "alice", "password": "hunter2" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["account"]["name"], "alice");
    // New accounts start lapsed: they must pay or redeem a code.
    assert_eq!(body["account"]["is_vip"], false);
    assert_eq!(body["account"]["referral_code"].as_str().unwrap().len(), 8);
}

#[tokio::test]
async fn register_duplicate_name_conflicts() {
    let harness = TestHarness::new();
    harness.register("alice").await;

    let response = harness
        .server
        .post("/v1/accounts/register")
        .json(&json!({ "name": "alice", "password": "other" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "conflict");
}

#[tokio::test]
async fn register_rejects_empty_name_and_password() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/accounts/register")
        .json(&json!({ "name": "  ", "password": "x" }))
        .await;
    response.assert_status_bad_request();

    let response = harness
        .server
        .post("/v1/accounts/register")
        .json(&json!({ "name": "bob", "password": "" }))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn register_with_unknown_referral_code_fails() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/accounts/register")
        .json(&json!({
            "name": "bob",
            "password": "hunter2",
            "referral_code": "NOSUCHCD",
        }))
        .await;

    response.assert_status_bad_request();
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn login_returns_fresh_token() {
    let harness = TestHarness::new();
    harness.register("alice").await;

    let response = harness
        .server
        .post("/v1/accounts/login")
        .json(&json!({ "name": "alice", "password": "hunter2" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let token = body["token"].as_str().unwrap();

    let me = harness.me(token).await;
    assert_eq!(me["name"], "alice");
}

#[tokio::test]
async fn login_wrong_password_unauthorized() {
    let harness = TestHarness::new();
    harness.register("alice").await;

    let response = harness
        .server
        .post("/v1/accounts/login")
        .json(&json!({ "name": "alice", "password": "wrong" }))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn login_unknown_name_unauthorized() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/accounts/login")
        .json(&json!({ "name": "ghost", "password": "hunter2" }))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn me_without_auth_unauthorized() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/accounts/me").await;
    response.assert_status_unauthorized();
}

// ============================================================================
// Password change
// ============================================================================

#[tokio::test]
async fn change_password_requires_old_password() {
    let harness = TestHarness::new();
    let token = harness.register("alice").await;

    let response = harness
        .server
        .put("/v1/accounts/password")
        .add_header("authorization", format!("Bearer {token}"))
        .json(&json!({ "old_password": "wrong", "new_password": "new-pass" }))
        .await;
    response.assert_status_unauthorized();

    let response = harness
        .server
        .put("/v1/accounts/password")
        .add_header("authorization", format!("Bearer {token}"))
        .json(&json!({ "old_password": "hunter2", "new_password": "new-pass" }))
        .await;
    response.assert_status_ok();

    // Old password no longer works, new one does.
    harness
        .server
        .post("/v1/accounts/login")
        .json(&json!({ "name": "alice", "password": "hunter2" }))
        .await
        .assert_status_unauthorized();

    harness
        .server
        .post("/v1/accounts/login")
        .json(&json!({ "name": "alice", "password": "new-pass" }))
        .await
        .assert_status_ok();
}

// ============================================================================
// Password recovery
// ============================================================================

#[tokio::test]
async fn forgot_password_resets_with_matching_phone() {
    let harness = TestHarness::new();
    harness
        .server
        .post("/v1/accounts/register")
        .json(&json!({
            "name": "alice",
            "password": "hunter2",
            "phone": "13800138000",
        }))
        .await
        .assert_status_ok();

    harness
        .server
        .post("/v1/accounts/forgot-password")
        .json(&json!({
            "name": "alice",
            "phone": "13800138000",
            "new_password": "recovered",
        }))
        .await
        .assert_status_ok();

    harness
        .server
        .post("/v1/accounts/login")
        .json(&json!({ "name": "alice", "password": "hunter2" }))
        .await
        .assert_status_unauthorized();

    harness
        .server
        .post("/v1/accounts/login")
        .json(&json!({ "name": "alice", "password": "recovered" }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn forgot_password_is_opaque_about_mismatches() {
    let harness = TestHarness::new();
    harness
        .server
        .post("/v1/accounts/register")
        .json(&json!({
            "name": "alice",
            "password": "hunter2",
            "phone": "13800138000",
        }))
        .await
        .assert_status_ok();
    // Bob has no phone on file, so recovery is closed to him.
    harness.register("bob").await;

    for (name, phone) in [
        ("alice", "13900000000"),
        ("ghost", "13800138000"),
        ("bob", "13800138000"),
    ] {
        harness
            .server
            .post("/v1/accounts/forgot-password")
            .json(&json!({ "name": name, "phone": phone, "new_password": "x" }))
            .await
            .assert_status_unauthorized();
    }

    // Nothing was reset along the way.
    harness
        .server
        .post("/v1/accounts/login")
        .json(&json!({ "name": "alice", "password": "hunter2" }))
        .await
        .assert_status_ok();
}

// ============================================================================
// Watchlist
// ============================================================================

#[tokio::test]
async fn watchlist_add_list_remove() {
    let harness = TestHarness::new();
    let token = harness.register("alice").await;

    for symbol in ["600519", "000001"] {
        harness
            .server
            .post("/v1/watchlist")
            .add_header("authorization", format!("Bearer {token}"))
            .json(&json!({ "symbol": symbol }))
            .await
            .assert_status_ok();
    }

    let response = harness
        .server
        .get("/v1/watchlist")
        .add_header("authorization", format!("Bearer {token}"))
        .await;
    response.assert_status_ok();
    let list: Vec<String> = response.json();
    assert_eq!(list, vec!["000001", "600519"]);

    harness
        .server
        .delete("/v1/watchlist/600519")
        .add_header("authorization", format!("Bearer {token}"))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/v1/watchlist")
        .add_header("authorization", format!("Bearer {token}"))
        .await;
    let list: Vec<String> = response.json();
    assert_eq!(list, vec!["000001"]);
}

// ============================================================================
// Admin user management
// ============================================================================

#[tokio::test]
async fn admin_routes_require_key() {
    let harness = TestHarness::new();

    harness
        .server
        .get("/v1/admin/users")
        .await
        .assert_status_unauthorized();

    harness
        .server
        .get("/v1/admin/users")
        .add_header("x-admin-key", "wrong-key")
        .await
        .assert_status_unauthorized();

    harness
        .server
        .get("/v1/admin/users")
        .add_header("x-admin-key", ADMIN_KEY)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn admin_can_disable_account() {
    let harness = TestHarness::new();
    let token = harness.register("alice").await;
    let me = harness.me(&token).await;
    let id = me["id"].as_str().unwrap();

    let response = harness
        .server
        .put(&format!("/v1/admin/users/{id}"))
        .add_header("x-admin-key", ADMIN_KEY)
        .json(&json!({ "is_active": false }))
        .await;
    response.assert_status_ok();

    // Disabled accounts cannot log in.
    let response = harness
        .server
        .post("/v1/accounts/login")
        .json(&json!({ "name": "alice", "password": "hunter2" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "account_disabled");
}

#[tokio::test]
async fn admin_expiry_override_can_move_backwards() {
    let harness = TestHarness::new();
    let token = harness.register("alice").await;
    let code = harness.generate_invite(365).await;

    harness
        .server
        .post("/v1/invites/redeem")
        .add_header("authorization", format!("Bearer {token}"))
        .json(&json!({ "code": code }))
        .await
        .assert_status_ok();

    let me = harness.me(&token).await;
    let id = me["id"].as_str().unwrap();
    assert_eq!(me["is_vip"], true);

    // Override the expiry to the past; normal grants could never do this.
    let response = harness
        .server
        .put(&format!("/v1/admin/users/{id}"))
        .add_header("x-admin-key", ADMIN_KEY)
        .json(&json!({ "expires_at": "2020-01-01T00:00:00Z" }))
        .await;
    response.assert_status_ok();

    let me = harness.me(&token).await;
    assert_eq!(me["is_vip"], false);
}

#[tokio::test]
async fn admin_delete_account() {
    let harness = TestHarness::new();
    let token = harness.register("alice").await;
    let me = harness.me(&token).await;
    let id = me["id"].as_str().unwrap();

    harness
        .server
        .delete(&format!("/v1/admin/users/{id}"))
        .add_header("x-admin-key", ADMIN_KEY)
        .await
        .assert_status_ok();

    harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", format!("Bearer {token}"))
        .await
        .assert_status_not_found();
}
