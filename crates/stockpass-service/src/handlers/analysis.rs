//! Paid analysis-call authorization.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Authorization response.
#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    /// Whether the call may proceed. Always true in a 200; refusals are
    /// 403 (not entitled) or 429 (over quota).
    pub allowed: bool,
    /// Analysis calls left in the current window after this one.
    pub remaining: u32,
}

/// Authorize one paid analysis call for the current user.
///
/// Checks entitlement first, then consumes one rate-limit slot. An
/// expired or disabled account is refused before its quota is touched.
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AuthorizeResponse>, ApiError> {
    let grant = state.engine.authorize_analysis(
        auth.account_id,
        state.config.analysis_limit,
        state.config.analysis_period_seconds,
    )?;

    tracing::debug!(
        account_id = %auth.account_id,
        remaining = %grant.remaining,
        "Analysis call authorized"
    );

    Ok(Json(AuthorizeResponse {
        allowed: true,
        remaining: grant.remaining,
    }))
}
