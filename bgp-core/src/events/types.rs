//! Event type definitions.

use crate::entities::PurchaseStatus;
use crate::processors::ReconcileError;
use bgp_sdk::objects::SyncSummary;
use tokio::sync::oneshot;

/// A purchase and its outbox row were committed and can be forwarded now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseQueued {
    pub purchase_id: i64,
}

pub type SyncReply = oneshot::Sender<Result<SyncSummary, ReconcileError>>;

/// Manual reconciliation request.
///
/// The runner answers on `reply` once the cycle has finished. A dropped
/// receiver is not an error; the cycle still runs.
#[derive(Debug)]
pub struct SyncRequest {
    /// Overrides the configured fetch limit for this run.
    pub limit: Option<u32>,
    pub reply: SyncReply,
}

/// A purchase left the pending state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseStatusChanged {
    pub purchase_id: i64,
    pub transaction_uid: String,
    pub status: PurchaseStatus,
}
