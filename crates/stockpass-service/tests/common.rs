//! Common test utilities for stockpass integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use serde_json::json;
use tempfile::TempDir;

use stockpass_service::{create_router, AppState, ServiceConfig};
use stockpass_store::RocksStore;

/// Admin key used by all test harnesses.
pub const ADMIN_KEY: &str = "test-admin-key";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct handle to the store for seeding and assertions.
    pub store: Arc<RocksStore>,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    pub fn new() -> Self {
        Self::with_analysis_limit(20)
    }

    /// Create a harness with a custom per-window analysis limit.
    pub fn with_analysis_limit(analysis_limit: u32) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            session_secret: "test-session-secret".into(),
            session_ttl_hours: 72,
            admin_key: Some(ADMIN_KEY.into()),
            analysis_limit,
            analysis_period_seconds: 3600,
            order_ttl_minutes: 30,
            frontend_url: "http://localhost:3000".into(),
            alipay_gateway_url: None,
            alipay_app_id: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        };

        let state = AppState::new(Arc::clone(&store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            _temp_dir: temp_dir,
        }
    }

    /// Register an account and return its session token.
    pub async fn register(&self, name: &str) -> String {
        let response = self
            .server
            .post("/v1/accounts/register")
            .json(&json!({ "name": name, "password": "hunter2" }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["token"].as_str().expect("token in response").into()
    }

    /// Register an account with a referral code; returns the session token.
    pub async fn register_referred(&self, name: &str, referral_code: &str) -> String {
        let response = self
            .server
            .post("/v1/accounts/register")
            .json(&json!({
                "name": name,
                "password": "hunter2",
                "referral_code": referral_code,
            }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["token"].as_str().expect("token in response").into()
    }

    /// Fetch the current account as JSON.
    pub async fn me(&self, token: &str) -> serde_json::Value {
        let response = self
            .server
            .get("/v1/accounts/me")
            .add_header("authorization", format!("Bearer {token}"))
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Generate one invite code via the admin API and return its token.
    pub async fn generate_invite(&self, duration_days: u32) -> String {
        let response = self
            .server
            .post("/v1/admin/invites/generate")
            .add_header("x-admin-key", ADMIN_KEY)
            .json(&json!({ "count": 1, "duration_days": duration_days }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body[0]["code"].as_str().expect("code in response").into()
    }

    /// Create a plan via the admin API and return its integer id.
    pub async fn create_plan(&self, name: &str, duration_days: u32, price_cents: i64) -> u64 {
        let response = self
            .server
            .post("/v1/admin/plans")
            .add_header("x-admin-key", ADMIN_KEY)
            .json(&json!({
                "name": name,
                "duration_days": duration_days,
                "price_cents": price_cents,
            }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["id"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .expect("plan id in response")
    }

    /// Create an order for a plan; returns the checkout response.
    pub async fn create_order(&self, token: &str, plan_id: u64) -> serde_json::Value {
        let response = self
            .server
            .post("/v1/orders")
            .add_header("authorization", format!("Bearer {token}"))
            .json(&json!({ "plan_id": plan_id }))
            .await;
        response.assert_status_ok();
        response.json()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
