//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Why a request with valid credentials was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// The account's VIP period has lapsed.
    SubscriptionExpired,

    /// The account was disabled by an administrator.
    AccountDisabled,
}

impl ForbiddenReason {
    fn code(self) -> &'static str {
        match self {
            Self::SubscriptionExpired => "subscription_expired",
            Self::AccountDisabled => "account_disabled",
        }
    }

    fn message(self) -> &'static str {
        match self {
            Self::SubscriptionExpired => "VIP subscription has expired",
            Self::AccountDisabled => "Account is disabled",
        }
    }
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but no entitlement.
    #[error("forbidden: {}", .0.code())]
    Forbidden(ForbiddenReason),

    /// Analysis quota exhausted for the current window.
    #[error("rate limited until {resume_at}")]
    RateLimited {
        /// When the window elapses and calls are allowed again.
        resume_at: DateTime<Utc>,
    },

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - duplicate name, code already used, or order not payable.
    /// An expected outcome of concurrent/duplicate requests, not a failure.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden(reason) => (
                StatusCode::FORBIDDEN,
                reason.code(),
                reason.message().to_string(),
                None,
            ),
            Self::RateLimited { resume_at } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                self.to_string(),
                Some(serde_json::json!({ "resume_at": resume_at.to_rfc3339() })),
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<stockpass_store::StoreError> for ApiError {
    fn from(err: stockpass_store::StoreError) -> Self {
        match err {
            stockpass_store::StoreError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} not found: {id}"))
            }
            stockpass_store::StoreError::DuplicateName { name } => {
                Self::Conflict(format!("account name already taken: {name}"))
            }
            stockpass_store::StoreError::CodeAlreadyUsed { .. } => {
                Self::Conflict("invite code already used".into())
            }
            stockpass_store::StoreError::OrderNotPayable { out_trade_no, status } => {
                Self::Conflict(format!("order {out_trade_no} is not payable ({status})"))
            }
            stockpass_store::StoreError::InvalidArgument(msg) => Self::BadRequest(msg),
            stockpass_store::StoreError::Database(msg)
            | stockpass_store::StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}
