//! Checkout and payment settlement integration tests.

mod common;

use axum::http::StatusCode;
use common::{TestHarness, ADMIN_KEY};
use serde_json::json;

// ============================================================================
// Plans
// ============================================================================

#[tokio::test]
async fn users_see_only_active_plans() {
    let harness = TestHarness::new();
    let token = harness.register("alice").await;
    harness.create_plan("Quarterly VIP", 90, 29_900).await;

    let response = harness
        .server
        .get("/v1/plans")
        .add_header("authorization", format!("Bearer {token}"))
        .await;
    response.assert_status_ok();

    let plans: serde_json::Value = response.json();
    let plans = plans.as_array().unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0]["name"], "Quarterly VIP");
    assert_eq!(plans[0]["price_formatted"], "¥299.00");
}

#[tokio::test]
async fn plan_creation_validates_terms() {
    let harness = TestHarness::new();

    harness
        .server
        .post("/v1/admin/plans")
        .add_header("x-admin-key", ADMIN_KEY)
        .json(&json!({ "name": "Broken", "duration_days": 0, "price_cents": 100 }))
        .await
        .assert_status_bad_request();

    harness
        .server
        .post("/v1/admin/plans")
        .add_header("x-admin-key", ADMIN_KEY)
        .json(&json!({ "name": "Broken", "duration_days": 30, "price_cents": -1 }))
        .await
        .assert_status_bad_request();
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
async fn checkout_creates_pending_order_with_mock_pay_url() {
    let harness = TestHarness::new();
    let token = harness.register("alice").await;
    let plan_id = harness.create_plan("Quarterly VIP", 90, 29_900).await;

    let checkout = harness.create_order(&token, plan_id).await;
    let order = &checkout["order"];

    assert!(order["out_trade_no"].as_str().unwrap().starts_with("STK"));
    assert_eq!(order["status"], "pending");
    assert_eq!(order["duration_days"], 90);
    assert_eq!(order["price_cents"], 29_900);

    // No gateway configured in tests, so checkout points at the mock page.
    let pay_url = checkout["pay_url"].as_str().unwrap();
    assert!(pay_url.starts_with("http://localhost:3000/payment/mock?no=STK"));
}

#[tokio::test]
async fn checkout_unknown_plan_not_found() {
    let harness = TestHarness::new();
    let token = harness.register("alice").await;

    let response = harness
        .server
        .post("/v1/orders")
        .add_header("authorization", format!("Bearer {token}"))
        .json(&json!({ "plan_id": 999 }))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn orders_are_owner_scoped() {
    let harness = TestHarness::new();
    let alice = harness.register("alice").await;
    let bob = harness.register("bob").await;
    let plan_id = harness.create_plan("Quarterly VIP", 90, 29_900).await;

    let checkout = harness.create_order(&alice, plan_id).await;
    let out_trade_no = checkout["order"]["out_trade_no"].as_str().unwrap();

    harness
        .server
        .get(&format!("/v1/orders/{out_trade_no}"))
        .add_header("authorization", format!("Bearer {alice}"))
        .await
        .assert_status_ok();

    harness
        .server
        .get(&format!("/v1/orders/{out_trade_no}"))
        .add_header("authorization", format!("Bearer {bob}"))
        .await
        .assert_status_not_found();
}

// ============================================================================
// Mock settlement
// ============================================================================

#[tokio::test]
async fn confirm_settles_once_and_replays_idempotently() {
    let harness = TestHarness::new();
    let token = harness.register("alice").await;
    let plan_id = harness.create_plan("Quarterly VIP", 90, 29_900).await;

    let checkout = harness.create_order(&token, plan_id).await;
    let out_trade_no = checkout["order"]["out_trade_no"].as_str().unwrap();

    let response = harness
        .server
        .post(&format!("/v1/orders/{out_trade_no}/confirm"))
        .add_header("authorization", format!("Bearer {token}"))
        .await;
    response.assert_status_ok();
    let first: serde_json::Value = response.json();
    assert_eq!(first["replayed"], false);

    // Re-delivering the confirmation changes nothing.
    let response = harness
        .server
        .post(&format!("/v1/orders/{out_trade_no}/confirm"))
        .add_header("authorization", format!("Bearer {token}"))
        .await;
    response.assert_status_ok();
    let second: serde_json::Value = response.json();
    assert_eq!(second["replayed"], true);
    assert_eq!(second["expires_at"], first["expires_at"]);

    let me = harness.me(&token).await;
    assert_eq!(me["is_vip"], true);
    assert_eq!(me["expires_at"], first["expires_at"]);
}

// ============================================================================
// Alipay webhook
// ============================================================================

#[tokio::test]
async fn webhook_settles_on_trade_success() {
    let harness = TestHarness::new();
    let token = harness.register("alice").await;
    let plan_id = harness.create_plan("Quarterly VIP", 90, 29_900).await;

    let checkout = harness.create_order(&token, plan_id).await;
    let out_trade_no = checkout["order"]["out_trade_no"]
        .as_str()
        .unwrap()
        .to_string();

    let response = harness
        .server
        .post("/webhooks/alipay")
        .form(&json!({
            "out_trade_no": out_trade_no,
            "trade_no": "2024alipay001",
            "trade_status": "TRADE_SUCCESS",
        }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.text(), "success");

    let me = harness.me(&token).await;
    assert_eq!(me["is_vip"], true);

    // Replayed delivery is acknowledged without a second grant.
    let expiry = me["expires_at"].clone();
    let response = harness
        .server
        .post("/webhooks/alipay")
        .form(&json!({
            "out_trade_no": out_trade_no,
            "trade_no": "2024alipay001",
            "trade_status": "TRADE_SUCCESS",
        }))
        .await;
    assert_eq!(response.text(), "success");
    assert_eq!(harness.me(&token).await["expires_at"], expiry);
}

#[tokio::test]
async fn webhook_ignores_non_success_status() {
    let harness = TestHarness::new();
    let token = harness.register("alice").await;
    let plan_id = harness.create_plan("Quarterly VIP", 90, 29_900).await;

    let checkout = harness.create_order(&token, plan_id).await;
    let out_trade_no = checkout["order"]["out_trade_no"].as_str().unwrap();

    let response = harness
        .server
        .post("/webhooks/alipay")
        .form(&json!({
            "out_trade_no": out_trade_no,
            "trade_status": "WAIT_BUYER_PAY",
        }))
        .await;
    assert_eq!(response.text(), "success");

    let me = harness.me(&token).await;
    assert_eq!(me["is_vip"], false);
}

#[tokio::test]
async fn webhook_rejects_malformed_order_number() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/webhooks/alipay")
        .form(&json!({
            "out_trade_no": "not-an-order",
            "trade_status": "TRADE_SUCCESS",
        }))
        .await;
    assert_eq!(response.text(), "error");
}

// ============================================================================
// Referral bonus
// ============================================================================

#[tokio::test]
async fn settlement_grants_referral_bonus() {
    let harness = TestHarness::new();
    let alice = harness.register("alice").await;
    let alice_me = harness.me(&alice).await;
    let referral_code = alice_me["referral_code"].as_str().unwrap();

    let bob = harness
        .register_referred("bob", referral_code)
        .await;

    let plan_id = harness.create_plan("Quarterly VIP", 90, 29_900).await;
    let checkout = harness.create_order(&bob, plan_id).await;
    let out_trade_no = checkout["order"]["out_trade_no"].as_str().unwrap();

    harness
        .server
        .post(&format!("/v1/orders/{out_trade_no}/confirm"))
        .add_header("authorization", format!("Bearer {bob}"))
        .await
        .assert_status_ok();

    // Bob gets the plan's 90 days; Alice gets ceil(90 / 10) = 9 bonus days.
    assert_eq!(harness.me(&bob).await["is_vip"], true);

    let alice_after = harness.me(&alice).await;
    assert_eq!(alice_after["is_vip"], true);
    assert!(
        alice_after["expires_at"].as_str().unwrap()
            > alice_me["expires_at"].as_str().unwrap()
    );
}

// ============================================================================
// Admin payment log
// ============================================================================

#[tokio::test]
async fn admin_order_log_and_stale_expiry() {
    let harness = TestHarness::new();
    let token = harness.register("alice").await;
    let plan_id = harness.create_plan("Quarterly VIP", 90, 29_900).await;
    harness.create_order(&token, plan_id).await;

    let response = harness
        .server
        .get("/v1/admin/orders")
        .add_header("x-admin-key", ADMIN_KEY)
        .await;
    response.assert_status_ok();
    let orders: serde_json::Value = response.json();
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["status"], "pending");

    // Fresh orders survive the sweep.
    let response = harness
        .server
        .post("/v1/admin/orders/expire-stale")
        .add_header("x-admin-key", ADMIN_KEY)
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["expired"], 0);
}

#[tokio::test]
async fn expired_order_cannot_settle() {
    let harness = TestHarness::new();
    let token = harness.register("alice").await;
    let plan_id = harness.create_plan("Quarterly VIP", 90, 29_900).await;

    let checkout = harness.create_order(&token, plan_id).await;
    let out_trade_no: stockpass_core::OrderNo = checkout["order"]["out_trade_no"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    // Force the order past its TTL through the store directly.
    {
        use stockpass_store::Store;
        let future = chrono::Utc::now() + chrono::Duration::hours(2);
        harness
            .store
            .expire_stale_orders(chrono::Duration::minutes(30), future)
            .unwrap();
    }

    let response = harness
        .server
        .post(&format!("/v1/orders/{out_trade_no}/confirm"))
        .add_header("authorization", format!("Bearer {token}"))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let me = harness.me(&token).await;
    assert_eq!(me["is_vip"], false);
}
