//! Invite-code redemption handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Redemption request.
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    /// The invite code token.
    pub code: String,
}

/// Redemption response.
#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    /// The account's VIP expiry after the grant.
    pub expires_at: String,
}

/// Redeem a single-use invite code for the current user.
///
/// Exactly one of N concurrent attempts on the same code succeeds; the
/// rest receive 409.
pub async fn redeem(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<RedeemRequest>,
) -> Result<Json<RedeemResponse>, ApiError> {
    let code = body.code.trim();
    if code.is_empty() {
        return Err(ApiError::BadRequest("code must not be empty".into()));
    }

    let new_expiry = state.engine.redeem_invite(auth.account_id, code)?;

    tracing::info!(
        account_id = %auth.account_id,
        new_expiry = %new_expiry,
        "Invite code redeemed"
    );

    Ok(Json(RedeemResponse {
        expires_at: new_expiry.to_rfc3339(),
    }))
}
