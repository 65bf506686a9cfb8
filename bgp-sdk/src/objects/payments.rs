//! Token purchase, reconciliation and payment settings types.

use serde::{Deserialize, Serialize};

use super::Signature;
use super::network::{Country, Currency, PaymentNetwork};

/// A purchasable bundle of tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPlan {
    pub id: String,
    pub name: String,
    pub tokens: i64,
    pub price_ugx: i64,
}

/// Purchase status for API responses.
///
/// This is the API/DTO version without sqlx::Type.
/// For database operations, use the version in `bgp-core::entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Failed,
}

impl PurchaseStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PurchaseStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Completed => "completed",
            PurchaseStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `POST /api/payments/subscribe` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub plan_id: String,
    pub phone: String,
    /// Network to charge. Inferred from the phone prefix when absent.
    #[serde(default)]
    pub provider: Option<PaymentNetwork>,
}

/// Returned once the purchase intent has been recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub transaction_uid: String,
    pub status: PurchaseStatus,
    pub plan_id: String,
    pub tokens: i64,
    pub provider: PaymentNetwork,
    pub phone_number: String,
    pub amount: rust_decimal::Decimal,
    pub currency: Currency,
    pub instructions: String,
}

/// A token purchase as seen by its owner or an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseResponse {
    pub id: i64,
    pub user_id: i64,
    pub transaction_uid: String,
    pub plan_id: String,
    pub amount_ugx: i64,
    pub tokens: i64,
    pub provider: PaymentNetwork,
    pub phone_number: String,
    pub status: PurchaseStatus,
    pub payment_url: Option<String>,
    pub local_country: Country,
    pub local_currency: Currency,
    pub local_amount: rust_decimal::Decimal,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

/// A transaction as reported by the mobile-money aggregator.
///
/// Used both for the collection listing and for the inbound webhook body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderTransaction {
    pub app_transaction_uid: String,
    pub transaction_status: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub total_amount: String,
    #[serde(default)]
    pub debit_phone_number: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Signature for ProviderTransaction {}

/// The aggregator reports amounts as either JSON strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// One local record whose status changed during a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub transaction_uid: String,
    pub from: PurchaseStatus,
    pub to: PurchaseStatus,
    pub provider_status: String,
}

/// Result of one reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Provider transactions fetched in this cycle.
    pub fetched: u32,
    /// Local pending records that had a provider counterpart.
    pub matched: u32,
    /// Local pending records with no provider counterpart in the window.
    pub unmatched_local: u32,
    pub status_changes: Vec<StatusChange>,
    pub synced_at: i64,
}

/// Mirrored provider collection with its cache freshness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionResponse {
    pub transaction_uid: String,
    pub amount: String,
    pub currency: Option<String>,
    pub status: String,
    pub local_status: Option<PurchaseStatus>,
    pub provider: Option<String>,
    pub phone_number: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub provider_created_at: Option<String>,
    pub synced_at: i64,
    pub is_fresh: bool,
}

/// Dev-only manual completion of a pending purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPaymentRequest {
    pub transaction_uid: String,
    #[serde(default = "default_test_outcome")]
    pub outcome: PurchaseStatus,
}

fn default_test_outcome() -> PurchaseStatus {
    PurchaseStatus::Completed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentEnvironment {
    Sandbox,
    Production,
}

impl PaymentEnvironment {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentEnvironment::Sandbox => "sandbox",
            PaymentEnvironment::Production => "production",
        }
    }
}

impl std::str::FromStr for PaymentEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sandbox" => Ok(PaymentEnvironment::Sandbox),
            "production" => Ok(PaymentEnvironment::Production),
            other => Err(format!("unknown payment environment: {other}")),
        }
    }
}

/// Current payment settings. The production token is never echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettingsResponse {
    pub environment: PaymentEnvironment,
    pub webhook_url: Option<String>,
    pub production_token_set: bool,
    /// Last four characters of the stored production token.
    pub production_token_hint: Option<String>,
}

/// `PUT /api/payments/admin/payment-settings` body. Absent fields are left unchanged;
/// an empty `webhook_url` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePaymentSettings {
    #[serde(default)]
    pub environment: Option<PaymentEnvironment>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub production_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalanceResponse {
    pub balance: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_transaction_accepts_numeric_amount() {
        let tx: ProviderTransaction = serde_json::from_str(
            r#"{"app_transaction_uid":"abc123","transaction_status":"completed","total_amount":5000}"#,
        )
        .unwrap();
        assert_eq!(tx.total_amount, "5000");
        assert_eq!(tx.debit_phone_number, None);
    }

    #[test]
    fn test_payment_defaults_to_completed() {
        let req: TestPaymentRequest =
            serde_json::from_str(r#"{"transaction_uid":"abc123"}"#).unwrap();
        assert_eq!(req.outcome, PurchaseStatus::Completed);
    }

    #[test]
    fn environment_round_trips_through_str() {
        assert_eq!(
            "production".parse::<PaymentEnvironment>(),
            Ok(PaymentEnvironment::Production)
        );
        assert!("staging".parse::<PaymentEnvironment>().is_err());
    }
}
