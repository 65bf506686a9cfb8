//! Event system connecting the HTTP layer to the background processors.
//!
//! # Event Flow
//!
//! 1. `PurchaseQueued` -> `OutboxForwarder`
//! 2. `SyncRequest` -> `ReconcileRunner`, answered through its reply handle
//! 3. Every settled purchase emits `PurchaseStatusChanged` on a broadcast channel
//!
//! Events carry identifiers rather than full data; processors re-fetch
//! from the database, so a lost or repeated event is harmless.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, EventSenders, PurchaseQueuedReceiver, PurchaseQueuedSender,
    PurchaseStatusReceiver, PurchaseStatusSender, SyncRequestReceiver, SyncRequestSender,
    purchase_queued_channel, purchase_status_channel, sync_request_channel,
};

pub use types::{PurchaseQueued, PurchaseStatusChanged, SyncReply, SyncRequest};
