//! Background processors and the settlement path they share.
//!
//! - `OutboxForwarder`: Receives `PurchaseQueued`, asks the aggregator for a payment prompt
//! - `ReconcileRunner`: Runs the `Reconciler` at startup, on an interval, and on `SyncRequest`
//! - `Settler`: Settles pending purchases and emits `PurchaseStatusChanged`

pub mod outbox_forwarder;
pub mod reconciler;
pub mod settlement;

pub use outbox_forwarder::{DeliveryOutcome, OutboxError, OutboxForwarder};
pub use reconciler::{MAX_FETCH_LIMIT, ReconcileError, ReconcileRunner, Reconciler};
pub use settlement::{SettlePurchase, Settler};
