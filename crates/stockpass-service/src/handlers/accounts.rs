//! Account registration, login, and profile handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use stockpass_core::Account;
use stockpass_store::Store;

use crate::auth::{issue_session_token, AuthUser};
use crate::crypto;
use crate::error::ApiError;
use crate::state::AppState;

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// VIP expiry timestamp.
    pub expires_at: String,
    /// Whether the account is currently entitled to paid features.
    pub is_vip: bool,
    /// Whether the account is enabled.
    pub is_active: bool,
    /// The account's referral code, for sharing.
    pub referral_code: String,
    /// Watched instrument codes.
    pub watchlist: Vec<String>,
    /// Created timestamp.
    pub created_at: String,
}

impl AccountResponse {
    pub(crate) fn from_account(account: &Account, now: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            id: account.id.to_string(),
            name: account.name.clone(),
            phone: account.phone.clone(),
            expires_at: account.expires_at.to_rfc3339(),
            is_vip: account.is_entitled(now),
            is_active: account.is_active,
            referral_code: account.referral_code.clone(),
            watchlist: account.watchlist.iter().cloned().collect(),
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Display name, unique.
    pub name: String,
    /// Plaintext password.
    pub password: String,
    /// Optional contact phone.
    pub phone: Option<String>,
    /// Optional referral code of an existing account.
    pub referral_code: Option<String>,
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Display name.
    pub name: String,
    /// Plaintext password.
    pub password: String,
}

/// Login/registration response: the account plus a session token.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// The authenticated account.
    pub account: AccountResponse,
}

/// Password change request.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    /// Current password, re-verified.
    pub old_password: String,
    /// New password.
    pub new_password: String,
}

/// Self-service password reset request.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    /// Display name.
    pub name: String,
    /// Phone on file, the recovery factor.
    pub phone: String,
    /// New password.
    pub new_password: String,
}

/// Watchlist mutation request.
#[derive(Debug, Deserialize)]
pub struct WatchlistRequest {
    /// Instrument code, e.g. "600519".
    pub symbol: String,
}

/// Register a new account and log it in.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".into()));
    }

    let account = state.engine.register(
        name,
        &body.password,
        body.phone,
        body.referral_code.as_deref(),
    )?;

    tracing::info!(account_id = %account.id, name = %account.name, "Account registered");

    let now = state.engine.now();
    let token = issue_session_token(
        account.id,
        &state.config.session_secret,
        state.config.session_ttl_hours,
        now,
    )?;

    Ok(Json(SessionResponse {
        token,
        account: AccountResponse::from_account(&account, now),
    }))
}

/// Verify credentials and mint a session token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let account = state.engine.login(body.name.trim(), &body.password)?;

    tracing::info!(account_id = %account.id, "Login");

    let now = state.engine.now();
    let token = issue_session_token(
        account.id,
        &state.config.session_secret,
        state.config.session_ttl_hours,
        now,
    )?;

    Ok(Json(SessionResponse {
        token,
        account: AccountResponse::from_account(&account, now),
    }))
}

/// Get the current user's account.
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.engine.account(auth.account_id)?;
    Ok(Json(AccountResponse::from_account(
        &account,
        state.engine.now(),
    )))
}

/// Entitlement check response.
#[derive(Debug, Serialize)]
pub struct EntitlementResponse {
    /// Whether the account currently qualifies for paid features.
    pub is_vip: bool,
    /// VIP expiry timestamp.
    pub expires_at: String,
}

/// Pure entitlement check. Consumes no rate-limit quota.
pub async fn get_entitlement(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<EntitlementResponse>, ApiError> {
    let account = state.engine.account(auth.account_id)?;
    Ok(Json(EntitlementResponse {
        is_vip: state.engine.is_entitled(&account),
        expires_at: account.expires_at.to_rfc3339(),
    }))
}

/// Change the current user's password.
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.new_password.is_empty() {
        return Err(ApiError::BadRequest("password must not be empty".into()));
    }

    let account = state.engine.account(auth.account_id)?;
    if !crypto::verify_password(&body.old_password, &account.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    state.store.set_password(
        auth.account_id,
        &crypto::hash_password(&body.new_password),
        state.engine.now(),
    )?;

    tracing::info!(account_id = %auth.account_id, "Password changed");

    Ok(Json(serde_json::json!({ "updated": true })))
}

/// Reset a forgotten password by verifying name and phone.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .engine
        .reset_password(body.name.trim(), body.phone.trim(), &body.new_password)?;

    tracing::info!(name = %body.name.trim(), "Password reset via recovery");

    Ok(Json(serde_json::json!({ "updated": true })))
}

/// List the current user's watchlist.
pub async fn get_watchlist(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<String>>, ApiError> {
    let account = state.engine.account(auth.account_id)?;
    Ok(Json(account.watchlist.iter().cloned().collect()))
}

/// Add an instrument to the current user's watchlist.
pub async fn add_watchlist(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<WatchlistRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let symbol = body.symbol.trim();
    if symbol.is_empty() {
        return Err(ApiError::BadRequest("symbol must not be empty".into()));
    }

    state
        .store
        .add_to_watchlist(auth.account_id, symbol, state.engine.now())?;

    Ok(Json(serde_json::json!({ "added": symbol })))
}

/// Remove an instrument from the current user's watchlist.
pub async fn remove_watchlist(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    axum::extract::Path(symbol): axum::extract::Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .store
        .remove_from_watchlist(auth.account_id, &symbol, state.engine.now())?;

    Ok(Json(serde_json::json!({ "removed": symbol })))
}
