//! Event channel factories and handles.

use super::types::{PurchaseQueued, PurchaseStatusChanged, SyncRequest};
use tokio::sync::{broadcast, mpsc};

/// Default buffer size for event channels.
///
/// This provides enough buffer to handle bursts while keeping memory bounded.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Manual syncs are serialized anyway; a short queue is enough.
const SYNC_REQUEST_BUFFER: usize = 8;

pub type PurchaseQueuedSender = mpsc::Sender<PurchaseQueued>;
pub type PurchaseQueuedReceiver = mpsc::Receiver<PurchaseQueued>;

pub type SyncRequestSender = mpsc::Sender<SyncRequest>;
pub type SyncRequestReceiver = mpsc::Receiver<SyncRequest>;

pub type PurchaseStatusSender = broadcast::Sender<PurchaseStatusChanged>;
pub type PurchaseStatusReceiver = broadcast::Receiver<PurchaseStatusChanged>;

/// Create a new PurchaseQueued channel.
///
/// Returns a (sender, receiver) pair for PurchaseQueued events.
pub fn purchase_queued_channel() -> (PurchaseQueuedSender, PurchaseQueuedReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

pub fn sync_request_channel() -> (SyncRequestSender, SyncRequestReceiver) {
    mpsc::channel(SYNC_REQUEST_BUFFER)
}

/// Create the status broadcast. Subscribers are created per WebSocket.
pub fn purchase_status_channel() -> (PurchaseStatusSender, PurchaseStatusReceiver) {
    broadcast::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Container for all event channel senders.
///
/// This provides a convenient way to pass around all event senders
/// to components that need to emit events.
#[derive(Clone)]
pub struct EventSenders {
    pub purchase_queued: PurchaseQueuedSender,
    pub sync_request: SyncRequestSender,
    pub purchase_status: PurchaseStatusSender,
}

impl EventSenders {
    pub fn new(
        purchase_queued: PurchaseQueuedSender,
        sync_request: SyncRequestSender,
        purchase_status: PurchaseStatusSender,
    ) -> Self {
        Self {
            purchase_queued,
            sync_request,
            purchase_status,
        }
    }
}
