//! Admin handlers: invite generation, user management, plan management,
//! and the payment log.
//!
//! All routes here require the `x-admin-key` header via [`AdminAuth`].

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpass_core::{AccountId, InviteCode};
use stockpass_store::Store;

use crate::auth::AdminAuth;
use crate::crypto;
use crate::error::ApiError;
use crate::handlers::accounts::AccountResponse;
use crate::handlers::payments::{OrderResponse, PlanResponse};
use crate::state::AppState;

/// Invite generation request.
#[derive(Debug, Deserialize)]
pub struct GenerateInvitesRequest {
    /// How many codes to generate (default 1).
    #[serde(default = "default_count")]
    pub count: u32,
    /// VIP days each code grants.
    pub duration_days: u32,
}

fn default_count() -> u32 {
    1
}

/// Invite code response.
#[derive(Debug, Serialize)]
pub struct InviteResponse {
    /// The code token.
    pub code: String,
    /// VIP days granted on redemption.
    pub duration_days: u32,
    /// Whether the code has been consumed.
    pub is_used: bool,
    /// The consuming account, if used.
    pub used_by: Option<String>,
    /// Created timestamp.
    pub created_at: String,
    /// Consumed timestamp, if used.
    pub used_at: Option<String>,
}

impl From<&InviteCode> for InviteResponse {
    fn from(code: &InviteCode) -> Self {
        Self {
            code: code.code.clone(),
            duration_days: code.duration_days,
            is_used: code.is_used,
            used_by: code.used_by.map(|id| id.to_string()),
            created_at: code.created_at.to_rfc3339(),
            used_at: code.used_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Partial user update. Absent fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    /// Enable or disable the account.
    pub is_active: Option<bool>,
    /// Reset the password.
    pub password: Option<String>,
    /// Override the VIP expiry absolutely. This is the only path that
    /// may move an expiry backwards.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Plan creation request.
#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    /// Display name.
    pub name: String,
    /// VIP days granted on purchase.
    pub duration_days: u32,
    /// Price in cents.
    pub price_cents: i64,
    /// Marketing description.
    #[serde(default)]
    pub description: String,
    /// Display ordering.
    #[serde(default)]
    pub sort_order: i32,
}

/// Generate fresh single-use invite codes.
pub async fn generate_invites(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Json(body): Json<GenerateInvitesRequest>,
) -> Result<Json<Vec<InviteResponse>>, ApiError> {
    let codes = state
        .store
        .generate_invites(body.count, body.duration_days, state.engine.now())?;

    tracing::info!(
        count = %codes.len(),
        duration_days = %body.duration_days,
        "Invite codes generated"
    );

    Ok(Json(codes.iter().map(InviteResponse::from).collect()))
}

/// List all invite codes.
pub async fn list_invites(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
) -> Result<Json<Vec<InviteResponse>>, ApiError> {
    let codes = state.store.list_invites()?;
    Ok(Json(codes.iter().map(InviteResponse::from).collect()))
}

/// List all accounts.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    let now = state.engine.now();
    let accounts = state.store.list_accounts()?;
    Ok(Json(
        accounts
            .iter()
            .map(|a| AccountResponse::from_account(a, now))
            .collect(),
    ))
}

/// Partially update an account.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Path(account_id): Path<AccountId>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let now = state.engine.now();

    if let Some(is_active) = body.is_active {
        state.store.set_active(account_id, is_active, now)?;
        tracing::info!(account_id = %account_id, is_active = %is_active, "Account active flag set");
    }

    if let Some(password) = &body.password {
        if password.is_empty() {
            return Err(ApiError::BadRequest("password must not be empty".into()));
        }
        state
            .store
            .set_password(account_id, &crypto::hash_password(password), now)?;
        tracing::info!(account_id = %account_id, "Password reset by admin");
    }

    if let Some(expires_at) = body.expires_at {
        state.store.update_expiry(account_id, expires_at, true, now)?;
        tracing::info!(account_id = %account_id, expires_at = %expires_at, "Expiry overridden by admin");
    }

    let account = state.engine.account(account_id)?;
    Ok(Json(AccountResponse::from_account(&account, now)))
}

/// Hard-delete an account.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Path(account_id): Path<AccountId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete_account(account_id)?;
    state.engine.forget_account(account_id);

    tracing::info!(account_id = %account_id, "Account deleted by admin");

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// List all plans, inactive included.
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
) -> Result<Json<Vec<PlanResponse>>, ApiError> {
    let plans = state.store.list_plans(true)?;
    Ok(Json(plans.iter().map(PlanResponse::from).collect()))
}

/// Create a subscription plan.
pub async fn create_plan(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Json(body): Json<CreatePlanRequest>,
) -> Result<Json<PlanResponse>, ApiError> {
    let plan = state.store.create_plan(
        body.name.trim(),
        body.duration_days,
        body.price_cents,
        &body.description,
        body.sort_order,
        state.engine.now(),
    )?;

    tracing::info!(plan_id = %plan.id, name = %plan.name, "Plan created");

    Ok(Json(PlanResponse::from(&plan)))
}

/// List all payment orders, newest first.
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.store.list_orders()?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// Garbage-collect orders left pending past the configured TTL.
pub async fn expire_stale_orders(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
) -> Result<Json<serde_json::Value>, ApiError> {
    let expired = state
        .engine
        .expire_stale_orders(state.config.order_ttl_minutes)?;

    if expired > 0 {
        tracing::info!(expired = %expired, "Stale orders expired");
    }

    Ok(Json(serde_json::json!({ "expired": expired })))
}
