//! Alipay checkout-URL collaborator.
//!
//! The payment gateway is an external collaborator: this client only
//! composes the hosted-checkout redirect URL for a pending order. Request
//! signing and callback signature verification live at the gateway edge
//! and are treated as a verified external fact by the settlement path.

use stockpass_core::PaymentOrder;

/// Client for the Alipay hosted-checkout gateway.
#[derive(Debug, Clone)]
pub struct AlipayClient {
    gateway_url: String,
    app_id: String,
    return_url: String,
    notify_url: String,
}

impl AlipayClient {
    /// Create a new client.
    #[must_use]
    pub fn new(gateway_url: &str, app_id: &str, frontend_url: &str, listen_base: &str) -> Self {
        Self {
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
            return_url: format!("{frontend_url}/payment/success"),
            notify_url: format!("{listen_base}/webhooks/alipay"),
        }
    }

    /// Build the hosted-checkout URL for a pending order.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn checkout_url(&self, order: &PaymentOrder) -> String {
        let subject = format!("Stock analysis VIP - {}", order.plan_name);
        let total_amount = format!("{:.2}", order.price_cents as f64 / 100.0);

        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("app_id", &self.app_id)
            .append_pair("out_trade_no", order.out_trade_no.as_str())
            .append_pair("total_amount", &total_amount)
            .append_pair("subject", &subject)
            .append_pair("return_url", &self.return_url)
            .append_pair("notify_url", &self.notify_url)
            .finish();

        format!("{}?{query}", self.gateway_url)
    }
}
