//! Runtime configuration re-exports.
//!
//! The validated config types live in `bgp_core::config`.

pub use bgp_core::config::{
    AdminConfig, CurrencyConfig, OutboxConfig, PricingConfig, ProviderConfig, ReconcileConfig,
    ServerConfig, SharedConfig,
};
