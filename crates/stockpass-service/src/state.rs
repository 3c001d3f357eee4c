//! Application state.

use std::sync::Arc;

use stockpass_core::SystemClock;
use stockpass_store::RocksStore;

use crate::alipay::AlipayClient;
use crate::config::ServiceConfig;
use crate::engine::Engine;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// The entitlement engine.
    pub engine: Arc<Engine>,

    /// Alipay client for hosted checkout (optional; mock checkout when
    /// unset).
    pub alipay: Option<Arc<AlipayClient>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        let engine = Arc::new(Engine::new(Arc::clone(&store), Arc::new(SystemClock)));

        let alipay = config
            .alipay_gateway_url
            .as_ref()
            .zip(config.alipay_app_id.as_ref())
            .map(|(gateway, app_id)| {
                tracing::info!(gateway = %gateway, "Alipay integration enabled");
                Arc::new(AlipayClient::new(
                    gateway,
                    app_id,
                    &config.frontend_url,
                    &format!("http://{}", config.listen_addr),
                ))
            });

        if alipay.is_none() {
            tracing::warn!("Alipay not configured - checkout will use the mock payment page");
        }

        if config.admin_key.is_none() {
            tracing::warn!("ADMIN_KEY not set - admin endpoints are disabled");
        }

        Self {
            store,
            config,
            engine,
            alipay,
        }
    }

    /// Check if Alipay is configured.
    #[must_use]
    pub fn has_alipay(&self) -> bool {
        self.alipay.is_some()
    }

    /// Checkout URL for a pending order: the real gateway when configured,
    /// otherwise the frontend's mock payment page.
    #[must_use]
    pub fn checkout_url(&self, order: &stockpass_core::PaymentOrder) -> String {
        match &self.alipay {
            Some(alipay) => alipay.checkout_url(order),
            None => format!(
                "{}/payment/mock?no={}",
                self.config.frontend_url, order.out_trade_no
            ),
        }
    }
}
