//! Aggregator endpoint configuration.

use bgp_sdk::objects::PaymentEnvironment;
use url::Url;

use crate::provider::OptimusEndpoint;

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub sandbox_base_url: Url,
    pub production_base_url: Url,
    pub sandbox_api_key: String,
    /// Fallback when no production token is stored in the admin settings.
    pub production_api_key: Option<String>,
    /// HMAC key for inbound webhook signatures.
    pub webhook_secret: String,
    /// Environment used until an admin stores a different one.
    pub default_environment: PaymentEnvironment,
    pub request_timeout: std::time::Duration,
}

impl ProviderConfig {
    /// Resolve the endpoint for an environment.
    ///
    /// A stored production token takes precedence over the configured key.
    /// Returns `None` for production when no key is available at all.
    pub fn endpoint(
        &self,
        environment: PaymentEnvironment,
        production_token: Option<&str>,
    ) -> Option<OptimusEndpoint> {
        match environment {
            PaymentEnvironment::Sandbox => Some(OptimusEndpoint {
                environment,
                base_url: self.sandbox_base_url.clone(),
                api_key: self.sandbox_api_key.clone(),
            }),
            PaymentEnvironment::Production => {
                let api_key = production_token
                    .filter(|t| !t.is_empty())
                    .map(str::to_owned)
                    .or_else(|| self.production_api_key.clone())?;
                Some(OptimusEndpoint {
                    environment,
                    base_url: self.production_base_url.clone(),
                    api_key,
                })
            }
        }
    }
}
