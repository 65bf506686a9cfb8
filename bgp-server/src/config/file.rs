//! TOML file configuration structures.
//!
//! These structs directly map to the `bgp-config.toml` file format.

use bgp_sdk::objects::{PaymentEnvironment, TokenPlan};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    #[serde(default)]
    pub outbox: OutboxConfig,
    pub currency: CurrencyConfig,
    #[serde(default)]
    pub plans: Vec<TokenPlan>,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Admin configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// The admin secret. If this is plaintext (doesn't start with `$argon2`),
    /// it will be hashed and the config file will be rewritten.
    pub secret: String,
}

/// Optimus aggregator section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub sandbox_base_url: Url,
    pub production_base_url: Url,
    pub sandbox_api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_api_key: Option<String>,
    /// Shared secret for `Bgp-Signature` on inbound webhooks.
    pub webhook_secret: String,
    #[serde(default = "default_environment")]
    pub default_environment: PaymentEnvironment,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_environment() -> PaymentEnvironment {
    PaymentEnvironment::Sandbox
}

fn default_request_timeout() -> u64 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,
    #[serde(default = "default_freshness")]
    pub collection_freshness_secs: u64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            fetch_limit: default_fetch_limit(),
            collection_freshness_secs: default_freshness(),
        }
    }
}

fn default_interval() -> u64 {
    30
}

fn default_fetch_limit() -> u32 {
    50
}

fn default_freshness() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_scan")]
    pub retry_scan_secs: u64,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_scan_secs: default_retry_scan(),
        }
    }
}

fn default_max_attempts() -> u32 {
    8
}

fn default_retry_scan() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Written as a string (`"0.035"`) to avoid float rounding.
    pub kes_per_ugx: Decimal,
}

impl FileConfig {
    /// Check if the admin secret is already hashed (argon2 format).
    pub fn is_admin_secret_hashed(&self) -> bool {
        bgp_core::config::AdminConfig::is_argon2_hash(&self.admin.secret)
    }
}
