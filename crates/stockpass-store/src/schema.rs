//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.
//! Each entity's primary key lives in its own column family, so the
//! storage layer itself enforces the uniqueness that ultimately prevents
//! double-redemption and double-settlement.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary account records, keyed by big-endian `account_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Index: account id by display name, keyed by the UTF-8 name.
    /// Value is the big-endian account id.
    pub const ACCOUNTS_BY_NAME: &str = "accounts_by_name";

    /// Invite codes, keyed by the code token.
    pub const INVITE_CODES: &str = "invite_codes";

    /// Subscription plans, keyed by big-endian `plan_id`.
    pub const PLANS: &str = "plans";

    /// Payment orders, keyed by `out_trade_no`.
    pub const ORDERS: &str = "orders";

    /// Engine metadata: id-allocation counters.
    pub const META: &str = "meta";
}

/// Keys within the `meta` column family.
pub mod meta {
    /// Counter for the next account id.
    pub const NEXT_ACCOUNT_ID: &[u8] = b"next_account_id";

    /// Counter for the next plan id.
    pub const NEXT_PLAN_ID: &[u8] = b"next_plan_id";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::ACCOUNTS_BY_NAME,
        cf::INVITE_CODES,
        cf::PLANS,
        cf::ORDERS,
        cf::META,
    ]
}
