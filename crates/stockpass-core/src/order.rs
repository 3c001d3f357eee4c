//! Payment orders and settlement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, OrderNo, Plan, PlanId};

/// Status of a payment order.
///
/// The only transitions are `Pending -> Paid` (settlement, exactly once)
/// and `Pending -> Expired` / `Pending -> Failed` (terminal cleanup).
/// Nothing leaves `Paid`, `Expired`, or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Awaiting payment.
    Pending,

    /// Settled. Terminal.
    Paid,

    /// Left pending past the TTL and garbage-collected. Terminal.
    Expired,

    /// Rejected by the gateway. Terminal.
    Failed,
}

/// A payment order for a subscription plan.
///
/// Plan terms (`plan_name`, `duration_days`, `price_cents`) are snapshots
/// taken at checkout; later plan edits do not affect the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrder {
    /// Unique order number, generated at creation.
    pub out_trade_no: OrderNo,

    /// The purchasing account.
    pub account_id: AccountId,

    /// The purchased plan.
    pub plan_id: PlanId,

    /// Snapshot of the plan name at checkout.
    pub plan_name: String,

    /// Snapshot of the granted VIP days at checkout.
    pub duration_days: u32,

    /// Snapshot of the price at checkout, in cents.
    pub price_cents: i64,

    /// Current status.
    pub status: OrderStatus,

    /// The gateway's own transaction id, recorded at settlement.
    pub trade_no: Option<String>,

    /// When the order was created.
    pub created_at: DateTime<Utc>,

    /// When the order settled. Set once, on `Pending -> Paid`.
    pub paid_at: Option<DateTime<Utc>>,

    /// The buyer's expiry computed at settlement. Replayed settlement
    /// confirmations return this value without re-extending.
    pub settled_expiry: Option<DateTime<Utc>>,
}

impl PaymentOrder {
    /// Create a pending order snapshotting the plan's current terms.
    #[must_use]
    pub fn new(account_id: AccountId, plan: &Plan, now: DateTime<Utc>) -> Self {
        Self {
            out_trade_no: OrderNo::generate(),
            account_id,
            plan_id: plan.id,
            plan_name: plan.name.clone(),
            duration_days: plan.duration_days,
            price_cents: plan.price_cents,
            status: OrderStatus::Pending,
            trade_no: None,
            created_at: now,
            paid_at: None,
            settled_expiry: None,
        }
    }

    /// Whether the order can still settle.
    #[must_use]
    pub fn is_payable(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}

/// The outcome of a settlement request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// The settled order.
    pub out_trade_no: OrderNo,

    /// The buyer's expiry after the grant.
    pub new_expiry: DateTime<Utc>,

    /// True when this request re-delivered an already-settled confirmation
    /// and no state changed.
    pub replayed: bool,
}
