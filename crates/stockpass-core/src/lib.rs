//! Core types and logic for the stockpass entitlement engine.
//!
//! This crate provides the foundational types used throughout the platform:
//!
//! - **Identifiers**: `AccountId`, `PlanId`, `OrderNo`
//! - **Accounts**: `Account` with VIP expiry, referral code, and watchlist
//! - **Invite codes**: single-use `InviteCode` tokens with a fixed duration
//! - **Plans & orders**: `Plan`, `PaymentOrder`, `OrderStatus`, `Settlement`
//! - **Rate limiting**: fixed-window `RateLimiter`
//! - **Time**: the injectable `Clock` trait
//!
//! # Expiry semantics
//!
//! VIP entitlement holds iff `now < expires_at`. Every grant (invite
//! redemption, payment settlement, referral bonus) extends the expiry with
//! `max(now, current_expiry) + duration`, so a lapsed account always
//! receives the full purchased duration starting from now.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod clock;
pub mod ids;
pub mod invite;
pub mod order;
pub mod plan;
pub mod rate;

pub use account::{extend_expiry, referral_bonus_days, Account};
pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::{AccountId, IdError, OrderNo, PlanId};
pub use invite::{InviteCode, CODE_LEN};
pub use order::{OrderStatus, PaymentOrder, Settlement};
pub use plan::Plan;
pub use rate::{RateDecision, RateLimiter};
