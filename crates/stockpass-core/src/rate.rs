//! Per-account fixed-window rate limiting.
//!
//! Gates paid analysis calls: each account gets `limit` calls per
//! `period`. The limit and period come from configuration on every call,
//! so they can change at runtime without resetting live windows.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::AccountId;

/// One account's window state.
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    window_start: DateTime<Utc>,
}

/// The decision for a single consumption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The call may proceed; `remaining` slots are left in this window.
    Allowed {
        /// Slots left in the current window after this call.
        remaining: u32,
    },

    /// The quota is exhausted until `resume_at`.
    Denied {
        /// When the window elapses and calls are allowed again.
        resume_at: DateTime<Utc>,
    },
}

/// In-memory fixed-window rate limiter keyed by account.
///
/// The check-then-increment for one account is a single critical section
/// under the map mutex, so two racing requests can never both take the
/// last slot.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<AccountId, Window>>,
}

impl RateLimiter {
    /// Create an empty limiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to consume one slot for `account_id`.
    ///
    /// If the window has elapsed it is reset to start at `now` before the
    /// check. A denial never consumes a slot.
    pub fn try_consume(
        &self,
        account_id: AccountId,
        limit: u32,
        period: Duration,
        now: DateTime<Utc>,
    ) -> RateDecision {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let window = windows.entry(account_id).or_insert(Window {
            count: 0,
            window_start: now,
        });

        if now >= window.window_start + period {
            window.count = 0;
            window.window_start = now;
        }

        if window.count < limit {
            window.count += 1;
            RateDecision::Allowed {
                remaining: limit - window.count,
            }
        } else {
            RateDecision::Denied {
                resume_at: window.window_start + period,
            }
        }
    }

    /// Drop the window for an account (e.g. after hard account deletion).
    pub fn forget(&self, account_id: AccountId) {
        self.windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&account_id);
    }
}
