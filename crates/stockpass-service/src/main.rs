//! StockPass Service - HTTP API for the entitlement and redemption engine.
//!
//! This is the main entry point for the stockpass service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockpass_service::{create_router, AppState, ServiceConfig};
use stockpass_store::{RocksStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,stockpass=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting StockPass Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        alipay_configured = %config.alipay_gateway_url.is_some(),
        admin_configured = %config.admin_key.is_some(),
        "Service configuration loaded"
    );

    // Initialize RocksDB store
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&config.data_dir)?);

    seed_default_plans(&store)?;

    // Build app state
    let state = AppState::new(store, config.clone());

    // Periodic cleanup of orders left pending past the TTL
    spawn_stale_order_sweep(&state);

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Seed the default subscription plans into an empty store.
fn seed_default_plans(store: &RocksStore) -> Result<(), Box<dyn std::error::Error>> {
    if !store.list_plans(true)?.is_empty() {
        return Ok(());
    }

    let now = chrono::Utc::now();
    store.create_plan("Quarterly VIP", 90, 29_900, "90 days of VIP access", 1, now)?;
    store.create_plan("Annual VIP", 365, 99_900, "365 days of VIP access", 2, now)?;

    tracing::info!("Seeded default subscription plans");
    Ok(())
}

/// Spawn the background sweep that expires stale pending orders.
fn spawn_stale_order_sweep(state: &AppState) {
    let engine = Arc::clone(&state.engine);
    let ttl_minutes = state.config.order_ttl_minutes;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            match engine.expire_stale_orders(ttl_minutes) {
                Ok(0) => {}
                Ok(expired) => tracing::info!(expired = %expired, "Expired stale pending orders"),
                Err(e) => tracing::error!(error = %e, "Stale-order sweep failed"),
            }
        }
    });
}
