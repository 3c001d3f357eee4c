//! Plan listing, checkout, and payment settlement handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Form;
use axum::Json;
use serde::{Deserialize, Serialize};

use stockpass_core::{OrderNo, PaymentOrder, Plan, PlanId};
use stockpass_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Plan response.
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    /// Plan id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// VIP days granted on purchase.
    pub duration_days: u32,
    /// Price in cents.
    pub price_cents: i64,
    /// Price formatted in yuan.
    pub price_formatted: String,
    /// Marketing description.
    pub description: String,
}

impl From<&Plan> for PlanResponse {
    fn from(plan: &Plan) -> Self {
        Self {
            id: plan.id.to_string(),
            name: plan.name.clone(),
            duration_days: plan.duration_days,
            price_cents: plan.price_cents,
            price_formatted: format!("¥{:.2}", plan.price_cents as f64 / 100.0),
            description: plan.description.clone(),
        }
    }
}

/// Order response.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// Order number.
    pub out_trade_no: String,
    /// Purchased plan name (snapshot).
    pub plan_name: String,
    /// VIP days granted on settlement (snapshot).
    pub duration_days: u32,
    /// Price in cents (snapshot).
    pub price_cents: i64,
    /// Current status.
    pub status: String,
    /// Created timestamp.
    pub created_at: String,
    /// Settled timestamp, if paid.
    pub paid_at: Option<String>,
}

impl From<&PaymentOrder> for OrderResponse {
    fn from(order: &PaymentOrder) -> Self {
        Self {
            out_trade_no: order.out_trade_no.to_string(),
            plan_name: order.plan_name.clone(),
            duration_days: order.duration_days,
            price_cents: order.price_cents,
            status: format!("{:?}", order.status).to_lowercase(),
            created_at: order.created_at.to_rfc3339(),
            paid_at: order.paid_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Checkout request.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// The plan to purchase.
    pub plan_id: PlanId,
}

/// Checkout response: the pending order plus where to pay it.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// The pending order.
    pub order: OrderResponse,
    /// Where the client should send the user to pay.
    pub pay_url: String,
}

/// Settlement response.
#[derive(Debug, Serialize)]
pub struct SettlementResponse {
    /// The settled order number.
    pub out_trade_no: String,
    /// The buyer's VIP expiry after the grant.
    pub expires_at: String,
    /// Whether this confirmation was a replay of an earlier settlement.
    pub replayed: bool,
}

/// List plans currently offered for sale.
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
) -> Result<Json<Vec<PlanResponse>>, ApiError> {
    let plans = state.store.list_plans(false)?;
    Ok(Json(plans.iter().map(PlanResponse::from).collect()))
}

/// Create a pending payment order for a plan.
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateOrderRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let plan = state
        .store
        .get_plan(body.plan_id)?
        .filter(|p| p.is_active)
        .ok_or_else(|| ApiError::NotFound(format!("plan not found: {}", body.plan_id)))?;

    let order = state.engine.create_order(auth.account_id, plan.id)?;
    let pay_url = state.checkout_url(&order);

    tracing::info!(
        account_id = %auth.account_id,
        out_trade_no = %order.out_trade_no,
        plan = %order.plan_name,
        price_cents = %order.price_cents,
        "Order created"
    );

    Ok(Json(CheckoutResponse {
        order: OrderResponse::from(&order),
        pay_url,
    }))
}

/// Get one of the current user's orders. The mock payment page polls this.
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(out_trade_no): Path<OrderNo>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .store
        .get_order(&out_trade_no)?
        .filter(|o| o.account_id == auth.account_id)
        .ok_or_else(|| ApiError::NotFound(format!("order not found: {out_trade_no}")))?;

    Ok(Json(OrderResponse::from(&order)))
}

/// Mock-mode settlement: the frontend's mock payment page confirms an
/// order directly. Rejected when a real gateway is configured.
pub async fn confirm_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(out_trade_no): Path<OrderNo>,
) -> Result<Json<SettlementResponse>, ApiError> {
    if state.has_alipay() {
        return Err(ApiError::BadRequest(
            "mock confirmation is disabled when a payment gateway is configured".into(),
        ));
    }

    let order = state
        .store
        .get_order(&out_trade_no)?
        .filter(|o| o.account_id == auth.account_id)
        .ok_or_else(|| ApiError::NotFound(format!("order not found: {out_trade_no}")))?;

    let settlement = state.engine.confirm_payment(&order.out_trade_no, None)?;

    tracing::info!(
        out_trade_no = %settlement.out_trade_no,
        replayed = %settlement.replayed,
        "Order settled via mock confirmation"
    );

    Ok(Json(SettlementResponse {
        out_trade_no: settlement.out_trade_no.to_string(),
        expires_at: settlement.new_expiry.to_rfc3339(),
        replayed: settlement.replayed,
    }))
}

/// Alipay asynchronous notification payload (the fields we consume).
#[derive(Debug, Deserialize)]
pub struct AlipayNotification {
    /// Our order number.
    pub out_trade_no: String,
    /// Alipay's transaction id.
    pub trade_no: Option<String>,
    /// Trade status, e.g. `TRADE_SUCCESS`.
    pub trade_status: Option<String>,
}

/// Handle the Alipay payment callback.
///
/// Signature verification happens at the gateway edge; this handler
/// treats the notification as a verified fact, checks `trade_status`,
/// and settles idempotently. Alipay expects the literal body "success"
/// to stop re-delivery, anything else to retry.
pub async fn alipay_webhook(
    State(state): State<Arc<AppState>>,
    Form(body): Form<AlipayNotification>,
) -> &'static str {
    let status = body.trade_status.as_deref().unwrap_or("");
    if status != "TRADE_SUCCESS" && status != "TRADE_FINISHED" {
        tracing::info!(
            out_trade_no = %body.out_trade_no,
            trade_status = %status,
            "Ignoring non-success Alipay notification"
        );
        return "success";
    }

    let out_trade_no: OrderNo = match body.out_trade_no.parse() {
        Ok(no) => no,
        Err(_) => {
            tracing::warn!(out_trade_no = %body.out_trade_no, "Malformed order number in callback");
            return "error";
        }
    };

    match state
        .engine
        .confirm_payment(&out_trade_no, body.trade_no.as_deref())
    {
        Ok(settlement) => {
            tracing::info!(
                out_trade_no = %settlement.out_trade_no,
                replayed = %settlement.replayed,
                "Order settled via Alipay callback"
            );
            "success"
        }
        // Conflict means the order is terminal (expired/failed); replays of
        // paid orders succeed above. Acknowledge so Alipay stops retrying.
        Err(ApiError::Conflict(msg)) => {
            tracing::warn!(out_trade_no = %out_trade_no, reason = %msg, "Unpayable order in callback");
            "success"
        }
        Err(e) => {
            tracing::error!(out_trade_no = %out_trade_no, error = %e, "Settlement failed");
            "error"
        }
    }
}
