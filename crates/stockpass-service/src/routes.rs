//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, admin, analysis, health, invites, payments};
use crate::state::AppState;

// ============================================================================
// Concurrency Limiting Constants
// ============================================================================

/// Maximum concurrent requests for analysis authorization.
/// This endpoint sits on the hot path of every paid analysis call.
const ANALYSIS_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /v1/accounts/register` - Register (optional referral code)
/// - `POST /v1/accounts/login` - Login, returns a session token
/// - `POST /v1/accounts/forgot-password` - Reset via name + phone on file
///
/// ## Session-authenticated
/// - `GET /v1/accounts/me` - Current account
/// - `PUT /v1/accounts/password` - Change password
/// - `GET /v1/entitlement` - Pure entitlement check (no quota consumed)
/// - `POST /v1/analysis/authorize` - Authorize one paid analysis call
/// - `POST /v1/invites/redeem` - Redeem a single-use invite code
/// - `GET/POST /v1/watchlist`, `DELETE /v1/watchlist/{symbol}`
/// - `GET /v1/plans` - Plans offered for sale
/// - `POST /v1/orders` - Checkout
/// - `GET /v1/orders/{out_trade_no}` - Order status
/// - `POST /v1/orders/{out_trade_no}/confirm` - Mock-mode settlement
///
/// ## Webhooks
/// - `POST /webhooks/alipay` - Alipay payment callback (form-encoded)
///
/// ## Admin (`x-admin-key`)
/// - Invite generation and listing, user management, plan management,
///   the payment log, and stale-order cleanup under `/v1/admin`
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    // Build CORS layer
    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Analysis authorization gets its own, higher concurrency limit:
    // it is called once per analysis and must not queue behind admin
    // listings or checkout.
    let analysis_routes = Router::new()
        .route("/authorize", post(analysis::authorize))
        .layer(ConcurrencyLimitLayer::new(ANALYSIS_MAX_CONCURRENT_REQUESTS));

    let admin_routes = Router::new()
        .route("/invites/generate", post(admin::generate_invites))
        .route("/invites", get(admin::list_invites))
        .route("/users", get(admin::list_users))
        .route("/users/:id", put(admin::update_user))
        .route("/users/:id", delete(admin::delete_user))
        .route("/plans", get(admin::list_plans))
        .route("/plans", post(admin::create_plan))
        .route("/orders", get(admin::list_orders))
        .route("/orders/expire-stale", post(admin::expire_stale_orders));

    let api_routes = Router::new()
        // Accounts
        .route("/accounts/register", post(accounts::register))
        .route("/accounts/login", post(accounts::login))
        .route(
            "/accounts/forgot-password",
            post(accounts::forgot_password),
        )
        .route("/accounts/me", get(accounts::get_me))
        .route("/accounts/password", put(accounts::change_password))
        // Entitlement
        .route("/entitlement", get(accounts::get_entitlement))
        // Watchlist
        .route("/watchlist", get(accounts::get_watchlist))
        .route("/watchlist", post(accounts::add_watchlist))
        .route("/watchlist/:symbol", delete(accounts::remove_watchlist))
        // Invite codes
        .route("/invites/redeem", post(invites::redeem))
        // Plans and checkout
        .route("/plans", get(payments::list_plans))
        .route("/orders", post(payments::create_order))
        .route("/orders/:out_trade_no", get(payments::get_order))
        .route(
            "/orders/:out_trade_no/confirm",
            post(payments::confirm_order),
        )
        // Analysis routes (with their own concurrency limit)
        .nest("/analysis", analysis_routes)
        // Admin routes
        .nest("/admin", admin_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes
        .nest("/v1", api_routes)
        // Webhooks (no rate limit - delivery is controlled by the gateway)
        .route("/webhooks/alipay", post(payments::alipay_webhook))
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
