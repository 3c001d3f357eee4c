//! Single-use invite codes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::code_from_random_bytes;
use crate::AccountId;

/// Length of generated invite codes.
pub const CODE_LEN: usize = 12;

/// A single-use invite code granting a fixed VIP duration.
///
/// A code transitions `is_used: false -> true` exactly once. Once used,
/// `used_by` and the grant it produced are permanent and never re-applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteCode {
    /// The opaque token, unique and fixed-length.
    pub code: String,

    /// VIP days granted on redemption. Fixed at generation time.
    pub duration_days: u32,

    /// Whether the code has been consumed.
    pub is_used: bool,

    /// The account that consumed the code, set exactly once.
    pub used_by: Option<AccountId>,

    /// When the code was generated.
    pub created_at: DateTime<Utc>,

    /// When the code was consumed.
    pub used_at: Option<DateTime<Utc>>,
}

impl InviteCode {
    /// Create a fresh, unused code with a random token.
    #[must_use]
    pub fn generate(duration_days: u32, now: DateTime<Utc>) -> Self {
        Self {
            code: code_from_random_bytes(CODE_LEN),
            duration_days,
            is_used: false,
            used_by: None,
            created_at: now,
            used_at: None,
        }
    }

    /// Mark the code as consumed by `account_id`.
    ///
    /// Callers must have verified `is_used == false` under the code's lock;
    /// this only records the transition.
    pub fn consume(&mut self, account_id: AccountId, now: DateTime<Utc>) {
        self.is_used = true;
        self.used_by = Some(account_id);
        self.used_at = Some(now);
    }
}
