pub mod admin_setting;
pub mod collection;
pub mod device;
pub mod feature;
pub mod purchase_outbox;
pub mod template;
pub mod token_purchase;
pub mod user;

use bgp_sdk::objects::catalog::FeatureStatus as SdkFeatureStatus;
use bgp_sdk::objects::{
    Country, Currency, PaymentNetwork as SdkPaymentNetwork, PurchaseStatus as SdkPurchaseStatus,
};

/// Purchase status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see `bgp_sdk::objects::PurchaseStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Failed,
}

impl From<PurchaseStatus> for SdkPurchaseStatus {
    fn from(value: PurchaseStatus) -> Self {
        match value {
            PurchaseStatus::Pending => SdkPurchaseStatus::Pending,
            PurchaseStatus::Completed => SdkPurchaseStatus::Completed,
            PurchaseStatus::Failed => SdkPurchaseStatus::Failed,
        }
    }
}

impl From<SdkPurchaseStatus> for PurchaseStatus {
    fn from(value: SdkPurchaseStatus) -> Self {
        match value {
            SdkPurchaseStatus::Pending => PurchaseStatus::Pending,
            SdkPurchaseStatus::Completed => PurchaseStatus::Completed,
            SdkPurchaseStatus::Failed => PurchaseStatus::Failed,
        }
    }
}

/// Mobile-money network for database operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentNetwork {
    Mtn,
    Airtel,
    Mpesa,
}

impl From<PaymentNetwork> for SdkPaymentNetwork {
    fn from(value: PaymentNetwork) -> Self {
        match value {
            PaymentNetwork::Mtn => SdkPaymentNetwork::Mtn,
            PaymentNetwork::Airtel => SdkPaymentNetwork::Airtel,
            PaymentNetwork::Mpesa => SdkPaymentNetwork::Mpesa,
        }
    }
}

impl From<SdkPaymentNetwork> for PaymentNetwork {
    fn from(value: SdkPaymentNetwork) -> Self {
        match value {
            SdkPaymentNetwork::Mtn => PaymentNetwork::Mtn,
            SdkPaymentNetwork::Airtel => PaymentNetwork::Airtel,
            SdkPaymentNetwork::Mpesa => PaymentNetwork::Mpesa,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
pub enum CountryCode {
    Ug,
    Ke,
}

impl From<CountryCode> for Country {
    fn from(value: CountryCode) -> Self {
        match value {
            CountryCode::Ug => Country::Uganda,
            CountryCode::Ke => Country::Kenya,
        }
    }
}

impl From<Country> for CountryCode {
    fn from(value: Country) -> Self {
        match value {
            Country::Uganda => CountryCode::Ug,
            Country::Kenya => CountryCode::Ke,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    Ugx,
    Kes,
}

impl From<CurrencyCode> for Currency {
    fn from(value: CurrencyCode) -> Self {
        match value {
            CurrencyCode::Ugx => Currency::Ugx,
            CurrencyCode::Kes => Currency::Kes,
        }
    }
}

impl From<Currency> for CurrencyCode {
    fn from(value: Currency) -> Self {
        match value {
            Currency::Ugx => CurrencyCode::Ugx,
            Currency::Kes => CurrencyCode::Kes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
pub enum FeatureStatus {
    Planned,
    InProgress,
    Completed,
}

impl From<FeatureStatus> for SdkFeatureStatus {
    fn from(value: FeatureStatus) -> Self {
        match value {
            FeatureStatus::Planned => SdkFeatureStatus::Planned,
            FeatureStatus::InProgress => SdkFeatureStatus::InProgress,
            FeatureStatus::Completed => SdkFeatureStatus::Completed,
        }
    }
}

impl From<SdkFeatureStatus> for FeatureStatus {
    fn from(value: SdkFeatureStatus) -> Self {
        match value {
            SdkFeatureStatus::Planned => FeatureStatus::Planned,
            SdkFeatureStatus::InProgress => FeatureStatus::InProgress,
            SdkFeatureStatus::Completed => FeatureStatus::Completed,
        }
    }
}
