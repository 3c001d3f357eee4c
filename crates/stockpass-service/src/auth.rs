//! Authentication extractors and session-token issuance.
//!
//! This module provides extractors for:
//! - `AuthUser` - End-user authentication via a server-issued session token
//! - `AdminAuth` - Admin authentication for privileged endpoints
//!
//! Session tokens are HS256 JWTs minted at login. The engine never trusts
//! client-asserted identity: every request re-derives the account from the
//! validated token subject.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use stockpass_core::AccountId;

use crate::error::ApiError;
use crate::state::AppState;

/// Session token claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account id.
    pub sub: String,
    /// Expiry (unix seconds).
    pub exp: i64,
    /// Issued-at (unix seconds).
    pub iat: i64,
}

/// Mint a session token for an account.
///
/// # Errors
///
/// Returns `ApiError::Internal` if signing fails.
pub fn issue_session_token(
    account_id: AccountId,
    secret: &str,
    ttl_hours: i64,
    now: DateTime<Utc>,
) -> Result<String, ApiError> {
    let claims = SessionClaims {
        sub: account_id.to_string(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to sign session token: {e}")))
}

/// An authenticated user extracted from a session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The account id from the validated token.
    pub account_id: AccountId,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let auth_header = parts
                .headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            let token = auth_header
                .strip_prefix("Bearer ")
                .ok_or(ApiError::Unauthorized)?;

            let data = decode::<SessionClaims>(
                token,
                &DecodingKey::from_secret(state.config.session_secret.as_bytes()),
                &Validation::default(),
            )
            .map_err(|_| ApiError::Unauthorized)?;

            let account_id = data
                .claims
                .sub
                .parse::<AccountId>()
                .map_err(|_| ApiError::Unauthorized)?;

            Ok(AuthUser { account_id })
        })
    }
}

/// Admin authentication via the `x-admin-key` header.
///
/// Used for privileged endpoints: invite generation, user management,
/// plan management, and the payment log.
#[derive(Debug, Clone)]
pub struct AdminAuth;

impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let provided = parts
                .headers
                .get("x-admin-key")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            // Admin routes are closed unless a key is configured.
            let expected = state
                .config
                .admin_key
                .as_ref()
                .ok_or(ApiError::Unauthorized)?;

            if provided != expected {
                return Err(ApiError::Unauthorized);
            }

            Ok(AdminAuth)
        })
    }
}
