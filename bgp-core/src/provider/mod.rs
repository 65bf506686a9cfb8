//! Outbound access to the mobile-money aggregator.

mod optimus;

pub use optimus::{OptimusClient, OptimusEndpoint};

use crate::entities::PurchaseStatus;
use async_trait::async_trait;
use bgp_sdk::objects::{Currency, PaymentNetwork, ProviderTransaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the aggregator.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No API key is available for the active environment
    #[error("payment provider is not configured for {0}")]
    NotConfigured(&'static str),

    #[error("invalid provider base URL: {0}")]
    InvalidBaseUrl(String),

    /// Transport error
    #[error("provider request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// API response parsing error
    #[error("provider response parsing error: {0}")]
    Parse(String),
}

/// Request for a mobile-money payment prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitiateCollection {
    /// Idempotency key on the provider side.
    pub app_transaction_uid: String,
    pub plan_id: String,
    pub phone: String,
    pub provider: PaymentNetwork,
    pub amount: Decimal,
    pub currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InitiatedCollection {
    #[serde(default, alias = "paymentUrl", alias = "checkout_url")]
    pub payment_url: Option<String>,
    #[serde(default, alias = "transaction_reference", alias = "provider_reference")]
    pub reference: Option<String>,
    #[serde(default)]
    pub transaction_status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionWindow {
    pub limit: u32,
    pub offset: u32,
}

/// Operations the purchase flow needs from the aggregator.
///
/// Implementations do not retry; callers own the retry policy.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn initiate_collection(
        &self,
        request: InitiateCollection,
    ) -> Result<InitiatedCollection, ProviderError>;

    /// Recent collections, newest first.
    async fn list_collections(
        &self,
        window: CollectionWindow,
    ) -> Result<Vec<ProviderTransaction>, ProviderError>;

    async fn get_collection(
        &self,
        transaction_uid: &str,
    ) -> Result<Option<ProviderTransaction>, ProviderError>;
}

/// Map an aggregator status string onto the local lifecycle.
///
/// Returns `None` for strings with no known meaning; such a status never
/// changes a local record.
pub fn map_provider_status(raw: &str) -> Option<PurchaseStatus> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "pending" | "pending-approval" | "pending_approval" | "processing" | "initiated"
        | "queued" => Some(PurchaseStatus::Pending),
        "completed" | "successful" | "success" | "succeeded" | "paid" => {
            Some(PurchaseStatus::Completed)
        }
        "failed" | "failure" | "cancelled" | "canceled" | "rejected" | "declined" | "expired"
        | "timeout" => Some(PurchaseStatus::Failed),
        _ => None,
    }
}
