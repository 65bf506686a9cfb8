//! Admin API request and response types.

use serde::{Deserialize, Serialize};

use super::network::PaymentNetwork;
use super::payments::{PurchaseResponse, PurchaseStatus};

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 200;
const DEFAULT_WINDOW: u32 = 500;
const MAX_WINDOW: u32 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    Amount,
    Tokens,
    Status,
    Provider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Query parameters for the purchases dashboard and its CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPurchasesQuery {
    pub status: Option<PurchaseStatus>,
    pub provider: Option<PaymentNetwork>,
    /// Case-insensitive substring of the transaction UID or phone number.
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_dir: SortDirection,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// How many of the most recent purchases to load before filtering.
    #[serde(default = "default_window")]
    pub window: u32,
}

impl Default for ListPurchasesQuery {
    fn default() -> Self {
        Self {
            status: None,
            provider: None,
            search: None,
            sort_by: SortField::default(),
            sort_dir: SortDirection::default(),
            page: default_page(),
            page_size: default_page_size(),
            window: default_window(),
        }
    }
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_window() -> u32 {
    DEFAULT_WINDOW
}

/// Clamp page and page size to safe bounds (`page >= 1`, `1..=200`).
pub fn clamp_pagination(page: u32, page_size: u32) -> (u32, u32) {
    (page.max(1), page_size.clamp(1, MAX_PAGE_SIZE))
}

/// Clamp the dashboard load window.
pub fn clamp_window(window: u32) -> u32 {
    window.clamp(1, MAX_WINDOW)
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderBreakdown {
    pub provider: PaymentNetwork,
    pub total: u32,
    pub completed: u32,
    pub completed_amount_ugx: i64,
}

/// Aggregates over the filtered purchase set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseStats {
    pub total: u32,
    pub completed: u32,
    pub failed: u32,
    pub pending: u32,
    pub completed_amount_ugx: i64,
    pub tokens_sold: i64,
    /// Percentage of completed purchases, two decimals.
    pub success_rate: f64,
    pub by_provider: Vec<ProviderBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchasePage {
    pub records: Vec<PurchaseResponse>,
    pub stats: PurchaseStats,
    pub page: u32,
    pub page_size: u32,
    pub total_filtered: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub initial_tokens: i64,
}

/// The API token is only ever returned here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedUserResponse {
    pub id: i64,
    pub email: String,
    pub api_token: String,
    pub token_balance: i64,
}
