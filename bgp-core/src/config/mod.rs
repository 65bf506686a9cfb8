//! Configuration types for BarcodeGen Pro.
//!
//! These types represent the validated runtime configuration used by the server
//! and can be shared across crates. The actual config loading/parsing is handled
//! by the server crate.

mod admin;
mod config_store;
mod pricing;
mod processing;
mod provider;
mod server;

pub use admin::AdminConfig;
pub use config_store::ConfigStore;
pub use pricing::{CurrencyConfig, PricingConfig};
pub use processing::{OutboxConfig, ReconcileConfig};
pub use provider::ProviderConfig;
pub use server::ServerConfig;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared configuration state with separate locks for each section.
///
/// This allows independent access to different configuration sections
/// without blocking other readers/writers.
#[derive(Clone)]
pub struct SharedConfig {
    /// Server configuration (listen address, etc.).
    pub server: Arc<RwLock<ServerConfig>>,
    /// Admin configuration (authentication).
    pub admin: Arc<RwLock<AdminConfig>>,
    /// Aggregator endpoints and credentials.
    pub provider: Arc<RwLock<ProviderConfig>>,
    /// Token plans and exchange rates.
    pub pricing: Arc<RwLock<PricingConfig>>,
    /// Reconciliation schedule. Read at startup only.
    pub reconcile: Arc<RwLock<ReconcileConfig>>,
    /// Outbox retry policy. Read at startup only.
    pub outbox: Arc<RwLock<OutboxConfig>>,
}
