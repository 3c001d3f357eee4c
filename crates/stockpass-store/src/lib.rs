//! `RocksDB` storage layer for the stockpass entitlement engine.
//!
//! This crate provides durable storage for accounts, invite codes,
//! subscription plans, and payment orders, using `RocksDB` column
//! families and CBOR-encoded values.
//!
//! # Architecture
//!
//! - `accounts`: account records, keyed by big-endian `account_id`
//! - `accounts_by_name`: unique name index
//! - `invite_codes`: single-use codes, keyed by the code token
//! - `plans`: subscription plans, keyed by big-endian `plan_id`
//! - `orders`: payment orders, keyed by `out_trade_no`
//! - `meta`: id-allocation counters
//!
//! # Atomicity
//!
//! The money-adjacent compound operations (`redeem_invite`,
//! `settle_order`, expiry extension) take a per-key lock for their
//! duration and commit all of their row effects in a single `WriteBatch`,
//! so concurrent requests on the same code/order/account observe exactly
//! one winner and no partial state.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod locks;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::{DateTime, Duration, Utc};
use stockpass_core::{Account, AccountId, InviteCode, OrderNo, PaymentOrder, Plan, PlanId, Settlement};

/// The storage trait defining all durable operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (e.g. `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Create a new account with a freshly-allocated id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateName` if the display name is taken.
    fn create_account(
        &self,
        name: &str,
        password_hash: &str,
        phone: Option<String>,
        referred_by: Option<AccountId>,
        now: DateTime<Utc>,
    ) -> Result<Account>;

    /// Get an account by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, account_id: AccountId) -> Result<Option<Account>>;

    /// Get an account by display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account_by_name(&self, name: &str) -> Result<Option<Account>>;

    /// Look up an account by its referral code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account_by_referral_code(&self, referral_code: &str) -> Result<Option<Account>>;

    /// List all accounts (admin view), ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Update an account's expiry.
    ///
    /// In normal mode sets `expires_at = max(current, new_expires_at)` so
    /// the expiry never moves backwards. In override mode (admin only)
    /// sets it absolutely.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn update_expiry(
        &self,
        account_id: AccountId,
        new_expires_at: DateTime<Utc>,
        admin_override: bool,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>>;

    /// Replace the account's password hash.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn set_password(&self, account_id: AccountId, password_hash: &str, now: DateTime<Utc>)
        -> Result<()>;

    /// Enable or disable the account.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn set_active(&self, account_id: AccountId, is_active: bool, now: DateTime<Utc>) -> Result<()>;

    /// Add an instrument to the account's watchlist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn add_to_watchlist(&self, account_id: AccountId, symbol: &str, now: DateTime<Utc>)
        -> Result<()>;

    /// Remove an instrument from the account's watchlist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn remove_from_watchlist(
        &self,
        account_id: AccountId,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Hard-delete an account and its name-index entry.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    fn delete_account(&self, account_id: AccountId) -> Result<()>;

    // =========================================================================
    // Invite Code Operations
    // =========================================================================

    /// Generate `count` fresh single-use codes, collision-checked against
    /// existing codes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidArgument` if `count == 0` or
    /// `duration_days == 0`.
    fn generate_invites(
        &self,
        count: u32,
        duration_days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<InviteCode>>;

    /// Get an invite code by token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_invite(&self, code: &str) -> Result<Option<InviteCode>>;

    /// List all invite codes (admin view).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_invites(&self) -> Result<Vec<InviteCode>>;

    /// Redeem an invite code for an account: atomically verify the code
    /// is unused, mark it consumed, and extend the account's expiry by
    /// the code's duration. Returns the new expiry.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` for an unknown code or account.
    /// - `StoreError::CodeAlreadyUsed` when the code was consumed —
    ///   exactly one of N concurrent attempts succeeds.
    fn redeem_invite(
        &self,
        code: &str,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>>;

    // =========================================================================
    // Plan Operations
    // =========================================================================

    /// Create a subscription plan with a freshly-allocated id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidArgument` if `duration_days == 0` or
    /// the price is negative.
    fn create_plan(
        &self,
        name: &str,
        duration_days: u32,
        price_cents: i64,
        description: &str,
        sort_order: i32,
        now: DateTime<Utc>,
    ) -> Result<Plan>;

    /// Get a plan by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_plan(&self, plan_id: PlanId) -> Result<Option<Plan>>;

    /// List plans ordered by `sort_order`. When `include_inactive` is
    /// false, only plans currently offered for sale are returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_plans(&self, include_inactive: bool) -> Result<Vec<Plan>>;

    // =========================================================================
    // Payment Order Operations
    // =========================================================================

    /// Create a pending order snapshotting the plan's current terms.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account or plan doesn't exist.
    fn create_order(
        &self,
        account_id: AccountId,
        plan_id: PlanId,
        now: DateTime<Utc>,
    ) -> Result<PaymentOrder>;

    /// Get an order by number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_order(&self, out_trade_no: &OrderNo) -> Result<Option<PaymentOrder>>;

    /// List all orders, newest first (admin payment log).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_orders(&self) -> Result<Vec<PaymentOrder>>;

    /// Settle an order: transition `Pending -> Paid` exactly once, extend
    /// the buyer's expiry by the snapshot duration, and grant the referral
    /// bonus to the referrer if the buyer was referred — all atomically.
    ///
    /// Re-delivering a confirmation for an already-`Paid` order returns
    /// the previously-computed settlement with `replayed = true` and
    /// changes nothing.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` for an unknown order.
    /// - `StoreError::OrderNotPayable` for `Expired`/`Failed` orders.
    fn settle_order(
        &self,
        out_trade_no: &OrderNo,
        trade_no: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Settlement>;

    /// Garbage-collect orders left `Pending` past `ttl` to `Expired`.
    /// Returns how many orders were expired. Advisory cleanup, not
    /// correctness-critical.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn expire_stale_orders(&self, ttl: Duration, now: DateTime<Utc>) -> Result<usize>;
}
