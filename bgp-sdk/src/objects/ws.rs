//! WebSocket message types for the purchase status stream.
//!
//! The `GET /api/payments/status/{transaction_uid}/ws` endpoint upgrades to
//! a WebSocket connection and pushes [`WsServerMessage`] JSON frames.
//!
//! # Protocol
//!
//! 1. The server sends a [`WsServerMessage::StatusUpdate`] with the
//!    current purchase immediately after the upgrade.
//! 2. Another frame follows whenever the purchase status changes.
//! 3. After a terminal status (`completed`, `failed`) the server sends a
//!    normal close frame.

use serde::{Deserialize, Serialize};

use super::payments::PurchaseResponse;

/// Server-to-client WebSocket message, tagged on `"type"`:
///
/// ```json
/// {"type":"status_update","purchase":{ ... }}
/// {"type":"error","code":4004,"reason":"purchase not found"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    StatusUpdate { purchase: PurchaseResponse },
    Error { code: u16, reason: String },
}

/// Close codes used by the purchase status stream.
pub struct WsCloseCode;

impl WsCloseCode {
    pub const NORMAL: u16 = 1000;
    pub const INTERNAL_ERROR: u16 = 1011;
    pub const PURCHASE_NOT_FOUND: u16 = 4004;
}
