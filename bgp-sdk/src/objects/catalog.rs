//! Feature requests, devices, label templates and barcode layout types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureStatus {
    #[serde(rename = "Planned")]
    Planned,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: FeatureStatus,
    pub upvotes: i64,
    pub submitted_by: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFeatureRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFeatureStatus {
    pub status: FeatureStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceResponse {
    pub id: i64,
    pub device_type: String,
    pub model_code: String,
    pub serial_pattern: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDeviceRequest {
    pub device_type: String,
    pub model_code: String,
    /// e.g. `SN-{####}`: the braced run of `#` becomes a zero-padded counter.
    pub serial_pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateResponse {
    pub id: i64,
    pub device_id: Option<i64>,
    pub name: String,
    pub rows: u32,
    pub columns: u32,
    pub field_bindings: Vec<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTemplateRequest {
    #[serde(default)]
    pub device_id: Option<i64>,
    pub name: String,
    pub rows: u32,
    pub columns: u32,
    #[serde(default)]
    pub field_bindings: Vec<String>,
}

/// `POST /api/barcodes/layout` body.
///
/// Either `serials` is given verbatim, or `count` serials are generated
/// from the template's device pattern starting at `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeLayoutRequest {
    pub template_id: i64,
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub serials: Option<Vec<String>>,
    #[serde(default)]
    pub start: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPlacement {
    pub serial: String,
    /// 1-based page number.
    pub page: u32,
    /// 0-based row within the page.
    pub row: u32,
    /// 0-based column within the row.
    pub column: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarcodeLayoutResponse {
    pub template_id: i64,
    pub rows: u32,
    pub columns: u32,
    pub field_bindings: Vec<String>,
    pub pages: u32,
    pub labels: Vec<LabelPlacement>,
    pub tokens_spent: i64,
    pub remaining_balance: i64,
}
