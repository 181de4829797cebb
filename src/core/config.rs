//! Server configuration
//!
//! All settings come from environment variables, loaded once at startup.
//!
//! | Variable | Default | Purpose |
//! |----------|---------|---------|
//! | WORK_DIR | ./work_dir | invoices, logs, database |
//! | HTTP_PORT | 3000 | HTTP API port |
//! | ENVIRONMENT | development | development \| staging \| production |
//! | SHOP_CURRENCY | EUR | currency code for new orders |
//! | SHIPPING_FEE | 495 | flat shipping fee in minor units |
//! | PROVIDER_TIMEOUT_MS | 10000 | outbound provider request timeout |
//! | CARD_SIGNING_SECRET | (required) | card-provider webhook signing secret |
//! | WALLET_WEBHOOK_ID | (required) | wallet-provider webhook identifier |
//! | WALLET_API_BASE | (required) | wallet-provider API base URL |
//! | WALLET_CLIENT_ID | (required) | wallet-provider API client id |
//! | WALLET_CLIENT_SECRET | (required) | wallet-provider API client secret |
//!
//! Payment credentials are deliberately required at construction time:
//! a missing secret must fail startup, never a request-time null-check.

use std::path::PathBuf;

use crate::common::AppError;

/// Payment-provider configuration, validated at construction
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Signing secret for the card provider's webhook HMAC check
    pub card_signing_secret: String,
    /// Webhook identifier registered with the wallet provider
    pub wallet_webhook_id: String,
    /// Wallet provider API base URL, no trailing slash
    pub wallet_api_base: String,
    /// Server-held wallet API credentials
    pub wallet_client_id: String,
    pub wallet_client_secret: String,
}

impl PaymentConfig {
    /// Load from environment; every field is required.
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            card_signing_secret: require("CARD_SIGNING_SECRET")?,
            wallet_webhook_id: require("WALLET_WEBHOOK_ID")?,
            wallet_api_base: require("WALLET_API_BASE")?
                .trim_end_matches('/')
                .to_string(),
            wallet_client_id: require("WALLET_CLIENT_ID")?,
            wallet_client_secret: require("WALLET_CLIENT_SECRET")?,
        })
    }
}

fn require(name: &str) -> Result<String, AppError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::Internal(format!(
            "missing required configuration: {name}"
        ))),
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory for database, logs and invoices
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// development | staging | production
    pub environment: String,
    /// Currency code used for newly created orders
    pub currency: String,
    /// Flat shipping fee in minor units, appended once per order
    pub shipping_fee: i64,
    /// Outbound provider request timeout (milliseconds)
    pub provider_timeout_ms: u64,
    /// Payment provider credentials
    pub payment: PaymentConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Fails when a required payment credential is absent.
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./work_dir".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            currency: std::env::var("SHOP_CURRENCY").unwrap_or_else(|_| "EUR".into()),
            shipping_fee: std::env::var("SHIPPING_FEE")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(495),
            provider_timeout_ms: std::env::var("PROVIDER_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10_000),
            payment: PaymentConfig::from_env()?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Database file path under the work directory
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("shop.db")
    }

    /// Directory where generated invoices are placed
    pub fn invoice_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("invoices")
    }

    /// Directory for rotating log files
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// Ensure the work directory layout exists
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.work_dir)?;
        std::fs::create_dir_all(self.invoice_dir())?;
        std::fs::create_dir_all(self.log_dir())?;
        Ok(())
    }
}
