pub mod admin;
pub mod catalog;
pub mod network;
pub mod payments;
pub mod ws;

pub use network::{Country, Currency, PaymentNetwork};
pub use payments::{
    CollectionResponse, PaymentEnvironment, PaymentSettingsResponse, ProviderTransaction,
    PurchaseResponse, PurchaseStatus, StatusChange, SubscribeRequest, SubscribeResponse,
    SyncSummary, TestPaymentRequest, TokenBalanceResponse, TokenPlan, UpdatePaymentSettings,
};

/// Marker trait for types that can participate in body signing via
/// [`SignedObject`](crate::signature::SignedObject).
pub use crate::signature::Signature;

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
