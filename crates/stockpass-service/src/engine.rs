//! The entitlement engine.
//!
//! Orchestrates the account store, invite-code ledger, payment-order
//! ledger, and rate limiter to answer "may this user use paid features
//! right now" and to apply the state-changing events (redemption,
//! settlement, referral bonus) behind them.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use stockpass_core::{
    Account, AccountId, Clock, OrderNo, PaymentOrder, PlanId, RateDecision, RateLimiter,
    Settlement,
};
use stockpass_store::{RocksStore, Store};

use crate::crypto;
use crate::error::{ApiError, ForbiddenReason};

/// The grant returned by a successful analysis authorization.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisGrant {
    /// Analysis calls left in the current window after this one.
    pub remaining: u32,
}

/// The entitlement engine.
///
/// All handlers route entitlement decisions and money-adjacent mutations
/// through this type; none of them touch the ledgers directly for those.
pub struct Engine {
    store: Arc<RocksStore>,
    limiter: RateLimiter,
    clock: Arc<dyn Clock>,
}

impl Engine {
    /// Create an engine over a store and time source.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            limiter: RateLimiter::new(),
            clock,
        }
    }

    /// The engine's current time.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Fetch an account, mapping absence to `NotFound`.
    pub fn account(&self, account_id: AccountId) -> Result<Account, ApiError> {
        Ok(self
            .store
            .get_account(account_id)?
            .ok_or(stockpass_store::StoreError::NotFound {
                entity: "account",
                id: account_id.to_string(),
            })?)
    }

    /// Whether the account currently qualifies for paid features.
    /// Pure read, no side effects.
    #[must_use]
    pub fn is_entitled(&self, account: &Account) -> bool {
        account.is_entitled(self.now())
    }

    /// Register a new account, resolving an optional referral code to the
    /// referring account.
    pub fn register(
        &self,
        name: &str,
        password: &str,
        phone: Option<String>,
        referral_code: Option<&str>,
    ) -> Result<Account, ApiError> {
        if password.is_empty() {
            return Err(ApiError::BadRequest("password must not be empty".into()));
        }

        let referred_by = match referral_code {
            Some(code) => Some(
                self.store
                    .get_account_by_referral_code(code)?
                    .ok_or_else(|| ApiError::BadRequest("unknown referral code".into()))?
                    .id,
            ),
            None => None,
        };

        let account = self.store.create_account(
            name,
            &crypto::hash_password(password),
            phone,
            referred_by,
            self.now(),
        )?;
        Ok(account)
    }

    /// Verify credentials and return the account.
    ///
    /// Wrong name and wrong password are indistinguishable to the caller.
    pub fn login(&self, name: &str, password: &str) -> Result<Account, ApiError> {
        let account = self
            .store
            .get_account_by_name(name)?
            .ok_or(ApiError::Unauthorized)?;

        if !crypto::verify_password(password, &account.password_hash) {
            return Err(ApiError::Unauthorized);
        }
        if !account.is_active {
            return Err(ApiError::Forbidden(ForbiddenReason::AccountDisabled));
        }

        Ok(account)
    }

    /// Self-service password reset, with the phone on file as the
    /// recovery factor.
    ///
    /// Mismatches are opaque: an unknown name, a wrong phone, and an
    /// account with no phone on file all fail identically.
    pub fn reset_password(
        &self,
        name: &str,
        phone: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        if new_password.is_empty() {
            return Err(ApiError::BadRequest("password must not be empty".into()));
        }

        let account = self
            .store
            .get_account_by_name(name)?
            .ok_or(ApiError::Unauthorized)?;
        if account.phone.as_deref() != Some(phone) {
            return Err(ApiError::Unauthorized);
        }

        self.store
            .set_password(account.id, &crypto::hash_password(new_password), self.now())?;
        Ok(())
    }

    /// Authorize one paid analysis call.
    ///
    /// Entitlement is checked before the rate limiter consumes a slot, so
    /// an expired account never burns its quota.
    pub fn authorize_analysis(
        &self,
        account_id: AccountId,
        limit: u32,
        period_seconds: i64,
    ) -> Result<AnalysisGrant, ApiError> {
        let now = self.now();
        let account = self.account(account_id)?;

        if !account.is_active {
            return Err(ApiError::Forbidden(ForbiddenReason::AccountDisabled));
        }
        if now >= account.expires_at {
            return Err(ApiError::Forbidden(ForbiddenReason::SubscriptionExpired));
        }

        match self
            .limiter
            .try_consume(account_id, limit, Duration::seconds(period_seconds), now)
        {
            RateDecision::Allowed { remaining } => Ok(AnalysisGrant { remaining }),
            RateDecision::Denied { resume_at } => Err(ApiError::RateLimited { resume_at }),
        }
    }

    /// Redeem an invite code for the account. Returns the new expiry.
    pub fn redeem_invite(
        &self,
        account_id: AccountId,
        code: &str,
    ) -> Result<DateTime<Utc>, ApiError> {
        Ok(self.store.redeem_invite(code, account_id, self.now())?)
    }

    /// Create a pending payment order for a plan.
    pub fn create_order(
        &self,
        account_id: AccountId,
        plan_id: PlanId,
    ) -> Result<PaymentOrder, ApiError> {
        Ok(self.store.create_order(account_id, plan_id, self.now())?)
    }

    /// Settle a payment order. Idempotent: replayed confirmations return
    /// the original result without re-extending anything.
    pub fn confirm_payment(
        &self,
        out_trade_no: &OrderNo,
        trade_no: Option<&str>,
    ) -> Result<Settlement, ApiError> {
        Ok(self.store.settle_order(out_trade_no, trade_no, self.now())?)
    }

    /// Garbage-collect stale pending orders. Returns the count expired.
    pub fn expire_stale_orders(&self, ttl_minutes: i64) -> Result<usize, ApiError> {
        Ok(self
            .store
            .expire_stale_orders(Duration::minutes(ttl_minutes), self.now())?)
    }

    /// Drop limiter state for a hard-deleted account.
    pub fn forget_account(&self, account_id: AccountId) {
        self.limiter.forget(account_id);
    }
}
