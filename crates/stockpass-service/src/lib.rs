//! StockPass HTTP API Service.
//!
//! This crate provides the HTTP API for the stock-analysis portal's
//! entitlement and redemption engine, including:
//!
//! - Account registration, login, and profile management
//! - VIP entitlement checks and analysis-call authorization
//! - Invite-code redemption
//! - Subscription plans, checkout, and payment settlement
//! - Admin operations (invite generation, user and plan management)
//!
//! # Authentication
//!
//! The service supports two authentication methods:
//!
//! 1. **Session tokens** - HS256 JWTs issued at login for end users
//! 2. **Admin API key** - the `x-admin-key` header for privileged endpoints
//!
//! The engine never trusts client-asserted identity or expiry: entitlement
//! is always recomputed server-side from the stored account record.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers are async for routing consistency

pub mod alipay;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use alipay::AlipayClient;
pub use config::ServiceConfig;
pub use engine::Engine;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
