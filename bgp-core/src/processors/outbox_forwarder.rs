//! OutboxForwarder processor.
//!
//! The OutboxForwarder is responsible for:
//! - Receiving `PurchaseQueued` events
//! - Asking the aggregator for a payment prompt for each queued purchase
//! - Storing the returned payment URL and reference
//! - Retrying failed deliveries with exponential backoff (2^n seconds)
//! - Abandoning an entry after `max_attempts`; the purchase stays `pending`
//!
//! Delivery is at-least-once. The purchase's transaction UID is the
//! aggregator's idempotency key, so a repeated request is harmless.

use crate::config::OutboxConfig;
use crate::entities::PurchaseStatus;
use crate::entities::admin_setting::LoadPaymentSettings;
use crate::entities::purchase_outbox::{
    GetDueOutboxEntries, GetOutboxEntryByPurchase, MarkOutboxDelivered, PurchaseOutboxEntry,
    RecordOutboxFailure,
};
use crate::entities::token_purchase::{GetTokenPurchaseById, RecordPaymentPrompt};
use crate::events::{PurchaseQueued, PurchaseQueuedReceiver};
use crate::framework::DatabaseProcessor;
use crate::provider::{InitiateCollection, PaymentProvider, ProviderError};
use crate::utils::now_unix;
use bgp_sdk::objects::Currency;
use kanau::processor::Processor;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Backoff exponent cap (2^11 = 2048 seconds max delay)
const MAX_BACKOFF_EXPONENT: u32 = 11;

/// Entries handled per retry scan.
const RETRY_BATCH: u32 = 32;

/// Errors that can occur during outbox delivery.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// What happened to one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The purchase already left `pending`; nothing to forward.
    Skipped,
    Rescheduled { next_attempt_at: i64 },
    Abandoned,
}

pub struct OutboxForwarder {
    db: DatabaseProcessor,
    provider: Arc<dyn PaymentProvider>,
    config: OutboxConfig,
    queued_rx: PurchaseQueuedReceiver,
    shutdown_rx: watch::Receiver<bool>,
}

impl OutboxForwarder {
    pub fn new(
        db: DatabaseProcessor,
        provider: Arc<dyn PaymentProvider>,
        config: OutboxConfig,
        queued_rx: PurchaseQueuedReceiver,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            db,
            provider,
            config,
            queued_rx,
            shutdown_rx,
        }
    }

    /// Run the OutboxForwarder.
    ///
    /// Queued events and retry scans are handled on the same loop, so one
    /// entry is never delivered twice concurrently.
    pub async fn run(mut self) {
        info!(max_attempts = self.config.max_attempts, "OutboxForwarder started");

        let mut retry_scan = tokio::time::interval(self.config.retry_scan);
        retry_scan.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("OutboxForwarder received shutdown signal");
                        break;
                    }
                }

                Some(event) = self.queued_rx.recv() => {
                    debug!(event = ?event, "Received PurchaseQueued");
                    if let Err(e) = self.handle_queued(event).await {
                        error!(
                            purchase_id = event.purchase_id,
                            error = %e,
                            "Failed to forward purchase"
                        );
                    }
                }

                _ = retry_scan.tick() => {
                    if let Err(e) = self.deliver_due().await {
                        error!(error = %e, "Failed to scan purchase outbox");
                    }
                }
            }
        }

        info!("OutboxForwarder shutdown complete");
    }

    async fn handle_queued(&self, event: PurchaseQueued) -> Result<(), OutboxError> {
        let Some(entry) = self
            .db
            .process(GetOutboxEntryByPurchase {
                purchase_id: event.purchase_id,
            })
            .await?
        else {
            warn!(purchase_id = event.purchase_id, "Queued purchase has no outbox entry");
            return Ok(());
        };
        if entry.is_open() {
            self.deliver(&entry).await?;
        }
        Ok(())
    }

    /// Attempt every entry whose retry time has come.
    pub async fn deliver_due(&self) -> Result<usize, OutboxError> {
        let due = self
            .db
            .process(GetDueOutboxEntries {
                now: now_unix(),
                limit: RETRY_BATCH,
            })
            .await?;
        let count = due.len();
        for entry in due {
            self.deliver(&entry).await?;
        }
        Ok(count)
    }

    /// One delivery attempt. Provider failures are recorded on the entry
    /// rather than returned.
    pub async fn deliver(
        &self,
        entry: &PurchaseOutboxEntry,
    ) -> Result<DeliveryOutcome, OutboxError> {
        let now = now_unix();
        let Some(purchase) = self
            .db
            .process(GetTokenPurchaseById {
                id: entry.purchase_id,
            })
            .await?
        else {
            error!(
                outbox_id = entry.id,
                purchase_id = entry.purchase_id,
                "Outbox entry without purchase"
            );
            self.db
                .process(RecordOutboxFailure {
                    outbox_id: entry.id,
                    error: "purchase not found".to_owned(),
                    next_attempt_at: now,
                    abandoned_at: Some(now),
                })
                .await?;
            return Ok(DeliveryOutcome::Abandoned);
        };

        if purchase.status != PurchaseStatus::Pending {
            self.db
                .process(MarkOutboxDelivered {
                    outbox_id: entry.id,
                    now,
                })
                .await?;
            return Ok(DeliveryOutcome::Skipped);
        }

        let callback_url = self.db.process(LoadPaymentSettings).await?.webhook_url;
        let currency: Currency = purchase.local_currency.into();
        let request = InitiateCollection {
            app_transaction_uid: purchase.transaction_uid.clone(),
            plan_id: purchase.plan_id.clone(),
            phone: purchase.phone_number.clone(),
            provider: purchase.provider.into(),
            amount: purchase.local_amount(),
            currency,
            callback_url,
        };

        match self.provider.initiate_collection(request).await {
            Ok(initiated) => {
                self.db
                    .process(RecordPaymentPrompt {
                        purchase_id: purchase.id,
                        payment_url: initiated.payment_url,
                        provider_reference: initiated.reference,
                    })
                    .await?;
                self.db
                    .process(MarkOutboxDelivered {
                        outbox_id: entry.id,
                        now,
                    })
                    .await?;
                info!(
                    uid = %purchase.transaction_uid,
                    attempts = entry.attempts + 1,
                    "Payment prompt sent"
                );
                Ok(DeliveryOutcome::Delivered)
            }
            Err(e) => {
                let attempts = u32::try_from(entry.attempts + 1).unwrap_or(u32::MAX);
                let (next_attempt_at, abandoned_at, outcome) =
                    if attempts >= self.config.max_attempts {
                        (now, Some(now), DeliveryOutcome::Abandoned)
                    } else {
                        let delay = calculate_retry_delay(attempts).as_secs();
                        let next = now + i64::try_from(delay).unwrap_or(i64::MAX - now);
                        (
                            next,
                            None,
                            DeliveryOutcome::Rescheduled {
                                next_attempt_at: next,
                            },
                        )
                    };

                if abandoned_at.is_some() {
                    warn!(
                        uid = %purchase.transaction_uid,
                        attempts,
                        error = %e,
                        "Giving up on payment prompt; purchase stays pending"
                    );
                } else {
                    warn!(
                        uid = %purchase.transaction_uid,
                        attempts,
                        next_attempt_at,
                        error = %e,
                        "Payment prompt failed"
                    );
                }

                self.db
                    .process(RecordOutboxFailure {
                        outbox_id: entry.id,
                        error: e.to_string(),
                        next_attempt_at,
                        abandoned_at,
                    })
                    .await?;
                Ok(outcome)
            }
        }
    }
}

/// Calculate the next retry delay based on retry count.
///
/// Uses exponential backoff: 2^retry_count seconds.
pub fn calculate_retry_delay(retry_count: u32) -> std::time::Duration {
    let seconds = 2u64.pow(retry_count.min(MAX_BACKOFF_EXPONENT));
    std::time::Duration::from_secs(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::admin_setting::SavePaymentSettings;
    use crate::entities::token_purchase::GetTokenPurchaseByUid;
    use crate::test_support::{FakeProvider, insert_purchase, insert_user, test_db};
    use bgp_sdk::objects::UpdatePaymentSettings;
    use std::time::Duration;

    fn forwarder(
        db: &DatabaseProcessor,
        provider: Arc<FakeProvider>,
        max_attempts: u32,
    ) -> OutboxForwarder {
        let (_, queued_rx) = crate::events::purchase_queued_channel();
        let (_, shutdown_rx) = watch::channel(false);
        OutboxForwarder::new(
            db.clone(),
            provider,
            OutboxConfig {
                max_attempts,
                retry_scan: Duration::from_secs(10),
            },
            queued_rx,
            shutdown_rx,
        )
    }

    async fn queued_entry(db: &DatabaseProcessor, uid: &str) -> PurchaseOutboxEntry {
        let user = insert_user(db, &format!("{uid}@example.com"), 0).await;
        let purchase = insert_purchase(db, user.id, uid, 5000, 100).await;
        let mut tx = db.pool.begin().await.unwrap();
        let entry = PurchaseOutboxEntry::insert_tx(&mut tx, purchase.id, 0)
            .await
            .unwrap();
        tx.commit().await.unwrap();
        entry
    }

    #[test]
    fn test_retry_delay_calculation() {
        assert_eq!(calculate_retry_delay(0), Duration::from_secs(1));
        assert_eq!(calculate_retry_delay(1), Duration::from_secs(2));
        assert_eq!(calculate_retry_delay(3), Duration::from_secs(8));
        assert_eq!(calculate_retry_delay(11), Duration::from_secs(2048));
        // Max capped at 11
        assert_eq!(calculate_retry_delay(100), Duration::from_secs(2048));
    }

    #[tokio::test]
    async fn delivery_stores_payment_prompt() {
        let db = test_db().await;
        db.process(SavePaymentSettings {
            update: UpdatePaymentSettings {
                webhook_url: Some("https://bgp.example/api/payments/webhook".into()),
                ..Default::default()
            },
            now: 1,
        })
        .await
        .unwrap();
        let entry = queued_entry(&db, "abc123").await;
        let provider = Arc::new(FakeProvider::default());

        let outcome = forwarder(&db, provider.clone(), 3)
            .deliver(&entry)
            .await
            .unwrap();
        assert_eq!(outcome, DeliveryOutcome::Delivered);

        let sent = provider.initiated();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].app_transaction_uid, "abc123");
        assert_eq!(
            sent[0].callback_url.as_deref(),
            Some("https://bgp.example/api/payments/webhook")
        );

        let purchase = db
            .process(GetTokenPurchaseByUid {
                transaction_uid: "abc123".into(),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(purchase.payment_url.as_deref(), Some("https://pay.example/abc123"));
        let stored = db
            .process(GetOutboxEntryByPurchase {
                purchase_id: entry.purchase_id,
            })
            .await
            .unwrap()
            .unwrap();
        assert!(stored.delivered_at.is_some());
    }

    #[tokio::test]
    async fn failures_back_off_then_abandon() {
        let db = test_db().await;
        let entry = queued_entry(&db, "abc123").await;
        let provider = Arc::new(FakeProvider::default());
        provider.fail_initiate(true);
        let forwarder = forwarder(&db, provider, 2);

        let first = forwarder.deliver(&entry).await.unwrap();
        assert!(
            matches!(
                first,
                DeliveryOutcome::Rescheduled { next_attempt_at }
                    if next_attempt_at > entry.next_attempt_at
            ),
            "expected a retry, got {first:?}"
        );

        let entry = db
            .process(GetOutboxEntryByPurchase {
                purchase_id: entry.purchase_id,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.attempts, 1);
        let second = forwarder.deliver(&entry).await.unwrap();
        assert_eq!(second, DeliveryOutcome::Abandoned);

        let entry = db
            .process(GetOutboxEntryByPurchase {
                purchase_id: entry.purchase_id,
            })
            .await
            .unwrap()
            .unwrap();
        assert!(entry.abandoned_at.is_some());
        let purchase = db
            .process(GetTokenPurchaseByUid {
                transaction_uid: "abc123".into(),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(purchase.status, PurchaseStatus::Pending);
    }

    #[tokio::test]
    async fn due_scan_picks_up_new_entries() {
        let db = test_db().await;
        queued_entry(&db, "a").await;
        queued_entry(&db, "b").await;
        let provider = Arc::new(FakeProvider::default());
        let forwarder = forwarder(&db, provider.clone(), 3);

        assert_eq!(forwarder.deliver_due().await.unwrap(), 2);
        assert_eq!(provider.initiated().len(), 2);
        assert_eq!(forwarder.deliver_due().await.unwrap(), 0);
    }
}
