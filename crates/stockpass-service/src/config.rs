//! Service configuration.

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to the `RocksDB` data directory (default: "/data/stockpass").
    pub data_dir: String,

    /// HMAC secret for session tokens.
    pub session_secret: String,

    /// Session token lifetime in hours (default: 72).
    pub session_ttl_hours: i64,

    /// Admin API key for privileged endpoints. Admin routes reject all
    /// requests when unset.
    pub admin_key: Option<String>,

    /// Analysis calls allowed per account per window (default: 20).
    pub analysis_limit: u32,

    /// Analysis rate-limit window length in seconds (default: 3600).
    pub analysis_period_seconds: i64,

    /// Pending orders older than this are garbage-collected to `Expired`
    /// (default: 30 minutes).
    pub order_ttl_minutes: i64,

    /// Frontend URL for checkout redirects and the mock payment page.
    pub frontend_url: String,

    /// Alipay gateway URL (optional; mock checkout when unset).
    pub alipay_gateway_url: Option<String>,

    /// Alipay app id (optional).
    pub alipay_app_id: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/stockpass".into()),
            session_secret: std::env::var("SESSION_SECRET").unwrap_or_else(|_| {
                tracing::warn!("SESSION_SECRET not set - using an insecure default");
                "insecure-dev-secret".into()
            }),
            session_ttl_hours: std::env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(72),
            admin_key: std::env::var("ADMIN_KEY").ok(),
            analysis_limit: std::env::var("ANALYSIS_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            analysis_period_seconds: std::env::var("ANALYSIS_PERIOD_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600),
            order_ttl_minutes: std::env::var("ORDER_TTL_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            alipay_gateway_url: std::env::var("ALIPAY_GATEWAY_URL").ok(),
            alipay_app_id: std::env::var("ALIPAY_APP_ID").ok(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/stockpass".into(),
            session_secret: "insecure-dev-secret".into(),
            session_ttl_hours: 72,
            admin_key: None,
            analysis_limit: 20,
            analysis_period_seconds: 3600,
            order_ttl_minutes: 30,
            frontend_url: "http://localhost:3000".into(),
            alipay_gateway_url: None,
            alipay_app_id: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
