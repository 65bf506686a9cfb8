//! Application state shared across all request handlers.

use bgp_core::config::{ConfigStore, SharedConfig};
use bgp_core::entities::admin_setting::{LoadPaymentSettings, PaymentSettings};
use bgp_core::events::EventSenders;
use bgp_core::framework::DatabaseProcessor;
use bgp_core::processors::Settler;
use bgp_core::provider::{OptimusEndpoint, PaymentProvider};
use bgp_sdk::objects::PaymentEnvironment;
use kanau::processor::Processor;
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseProcessor,
    /// Runtime configuration (sections reload via SIGHUP).
    pub config: SharedConfig,
    pub events: EventSenders,
    /// Shared settlement path for webhooks and test payments.
    pub settler: Settler,
    /// Endpoint used by the Optimus client; swapped when settings change.
    pub provider_endpoint: ConfigStore<Option<OptimusEndpoint>>,
    /// Client reading `provider_endpoint`; used for single-purchase lookups.
    pub provider: Arc<dyn PaymentProvider>,
}

impl AppState {
    pub fn new(
        db: DatabaseProcessor,
        config: SharedConfig,
        events: EventSenders,
        provider_endpoint: ConfigStore<Option<OptimusEndpoint>>,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        let settler = Settler::new(db.clone(), events.purchase_status.clone());
        Self {
            db,
            config,
            events,
            settler,
            provider_endpoint,
            provider,
        }
    }

    /// Environment in effect: stored setting first, then the config default.
    pub async fn payment_environment(&self) -> Result<PaymentEnvironment, sqlx::Error> {
        let settings = self.db.process(LoadPaymentSettings).await?;
        let default = self.config.provider.read().await.default_environment;
        Ok(settings.effective_environment(default))
    }

    /// Recompute the Optimus endpoint from stored settings and the config file.
    pub async fn refresh_provider_endpoint(&self) -> Result<PaymentSettings, sqlx::Error> {
        let settings = self.db.process(LoadPaymentSettings).await?;
        let endpoint = {
            let provider = self.config.provider.read().await;
            let environment = settings.effective_environment(provider.default_environment);
            let endpoint = provider.endpoint(environment, settings.production_token.as_deref());
            if endpoint.is_none() {
                tracing::warn!(
                    environment = environment.as_str(),
                    "No API key for payment environment; provider calls will fail"
                );
            }
            endpoint
        };
        self.provider_endpoint.update(endpoint).await;
        Ok(settings)
    }
}
