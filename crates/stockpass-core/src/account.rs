//! Account types and expiry-extension math.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::AccountId;

/// Length of generated referral codes.
const REFERRAL_CODE_LEN: usize = 8;

/// Alphabet for generated codes. 32 characters (no 0/O/1/I) so that a
/// byte modulo the alphabet length stays unbiased.
pub(crate) const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// A user account.
///
/// VIP entitlement is derived solely from `expires_at`: the account is
/// entitled iff it is active and `now < expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Stable integer id allocated at registration.
    pub id: AccountId,

    /// Display name, unique across accounts.
    pub name: String,

    /// Contact phone, optional.
    pub phone: Option<String>,

    /// SHA-256 hex digest of the password.
    pub password_hash: String,

    /// VIP entitlement expiry. Monotonically non-decreasing except via
    /// explicit admin override.
    pub expires_at: DateTime<Utc>,

    /// Whether the account may log in and use the service at all.
    pub is_active: bool,

    /// Unique referral code, generated at creation, immutable.
    pub referral_code: String,

    /// The account that referred this one, if any. Set at registration.
    pub referred_by: Option<AccountId>,

    /// Watched instrument codes (order-irrelevant).
    pub watchlist: BTreeSet<String>,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account.
    ///
    /// New accounts start already lapsed (`expires_at = now`): the user
    /// must pay or redeem an invite code to unlock paid features.
    #[must_use]
    pub fn new(
        id: AccountId,
        name: String,
        password_hash: String,
        phone: Option<String>,
        referred_by: Option<AccountId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            phone,
            password_hash,
            expires_at: now,
            is_active: true,
            referral_code: generate_referral_code(),
            referred_by,
            watchlist: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the account is currently entitled to paid features.
    #[must_use]
    pub fn is_entitled(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.expires_at
    }

    /// Extend the expiry by `duration_days`, starting from whichever of
    /// `now` and the current expiry is later. Returns the new expiry.
    pub fn extend(&mut self, duration_days: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        self.expires_at = extend_expiry(now, self.expires_at, duration_days);
        self.updated_at = now;
        self.expires_at
    }
}

/// Expiry-extension rule shared by invite redemption, payment settlement,
/// and referral bonuses.
///
/// The extension starts from `max(now, current_expiry)`: a lapsed account
/// receives the full duration from now rather than losing the gap since
/// its stale expiry.
#[must_use]
pub fn extend_expiry(
    now: DateTime<Utc>,
    current_expiry: DateTime<Utc>,
    duration_days: u32,
) -> DateTime<Utc> {
    current_expiry.max(now) + Duration::days(i64::from(duration_days))
}

/// Referral bonus for a settled plan purchase: `ceil(10%)` of the plan
/// duration, in whole days.
#[must_use]
pub fn referral_bonus_days(plan_duration_days: u32) -> u32 {
    plan_duration_days.div_ceil(10)
}

/// Generate a random referral code.
fn generate_referral_code() -> String {
    code_from_random_bytes(REFERRAL_CODE_LEN)
}

/// Map `len` uniformly random bytes into the code alphabet.
pub(crate) fn code_from_random_bytes(len: usize) -> String {
    use rand::RngCore;

    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| char::from(CODE_ALPHABET[*b as usize % CODE_ALPHABET.len()]))
        .collect()
}
