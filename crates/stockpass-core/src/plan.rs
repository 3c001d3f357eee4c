//! Subscription plans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::PlanId;

/// A purchasable VIP subscription plan.
///
/// Orders snapshot the plan's terms at creation time, so editing a plan's
/// price or duration never retroactively changes already-settled orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Stable integer id.
    pub id: PlanId,

    /// Display name, e.g. "Quarterly VIP".
    pub name: String,

    /// VIP days granted per purchase. Always positive.
    pub duration_days: u32,

    /// Price in cents. Stored as an integer to avoid floating point drift.
    pub price_cents: i64,

    /// Marketing description.
    pub description: String,

    /// Display ordering on the pricing page.
    pub sort_order: i32,

    /// Whether the plan is currently offered for sale.
    pub is_active: bool,

    /// When the plan was created.
    pub created_at: DateTime<Utc>,
}
