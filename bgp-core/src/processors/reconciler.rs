//! Reconciler and ReconcileRunner.
//!
//! The Reconciler is responsible for:
//! - Fetching the aggregator's most recent collections
//! - Refreshing the local collections mirror
//! - Settling local pending purchases the aggregator reports as finished
//!
//! The ReconcileRunner owns every reconciliation run: once at startup, on a
//! fixed interval, and on manual `SyncRequest`s. Runs never overlap.

use crate::entities::PurchaseStatus;
use crate::entities::collection::{Collection, UpsertCollections};
use crate::entities::token_purchase::{CountPendingPurchases, ListPendingPurchasesByUids};
use crate::events::{SyncRequest, SyncRequestReceiver};
use crate::framework::DatabaseProcessor;
use crate::processors::settlement::Settler;
use crate::provider::{CollectionWindow, PaymentProvider, ProviderError, map_provider_status};
use crate::utils::now_unix;
use bgp_sdk::objects::{ProviderTransaction, StatusChange, SyncSummary};
use kanau::processor::Processor;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Largest window a single run may request from the aggregator.
pub const MAX_FETCH_LIMIT: u32 = 500;

/// Errors that can occur during reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("reconciliation runner is not running")]
    RunnerUnavailable,
}

#[derive(Clone)]
pub struct Reconciler {
    db: DatabaseProcessor,
    provider: Arc<dyn PaymentProvider>,
    settler: Settler,
}

impl Reconciler {
    pub fn new(
        db: DatabaseProcessor,
        provider: Arc<dyn PaymentProvider>,
        settler: Settler,
    ) -> Self {
        Self {
            db,
            provider,
            settler,
        }
    }

    /// Run one reconciliation cycle over the `limit` most recent collections.
    ///
    /// Only rows that actually changed are reported, so a repeated run
    /// without provider-side changes yields no status changes.
    pub async fn reconcile(&self, limit: u32) -> Result<SyncSummary, ReconcileError> {
        let limit = limit.clamp(1, MAX_FETCH_LIMIT);
        let transactions = self
            .provider
            .list_collections(CollectionWindow { limit, offset: 0 })
            .await?;
        let synced_at = now_unix();
        let fetched = u32::try_from(transactions.len()).unwrap_or(u32::MAX);

        // Collections arrive newest first; the newest entry per UID is authoritative.
        let mut by_uid: HashMap<&str, &ProviderTransaction> = HashMap::new();
        let mut latest = Vec::with_capacity(transactions.len());
        for t in &transactions {
            if let Entry::Vacant(slot) = by_uid.entry(t.app_transaction_uid.as_str()) {
                slot.insert(t);
                latest.push(t);
            }
        }

        self.db
            .process(UpsertCollections {
                collections: latest
                    .iter()
                    .map(|t| Collection::from_provider(t, synced_at))
                    .collect(),
            })
            .await?;

        let pending_total = self.db.process(CountPendingPurchases).await?;

        let pending = self
            .db
            .process(ListPendingPurchasesByUids {
                transaction_uids: by_uid.keys().map(|uid| (*uid).to_owned()).collect(),
            })
            .await?;

        let matched = u32::try_from(pending.len()).unwrap_or(u32::MAX);
        let unmatched_local =
            u32::try_from((pending_total - i64::from(matched)).max(0)).unwrap_or(u32::MAX);

        let mut status_changes = Vec::new();
        for purchase in pending {
            let Some(remote) = by_uid.get(purchase.transaction_uid.as_str()) else {
                continue;
            };

            match Decimal::from_str(remote.total_amount.trim()) {
                Ok(amount) if amount != purchase.local_amount() => warn!(
                    uid = %purchase.transaction_uid,
                    local = %purchase.local_amount(),
                    remote = %amount,
                    "Provider amount differs from purchase amount"
                ),
                Ok(_) => {}
                Err(_) => debug!(
                    uid = %purchase.transaction_uid,
                    raw = %remote.total_amount,
                    "Provider amount is not a number"
                ),
            }

            let to = match map_provider_status(&remote.transaction_status) {
                Some(status @ (PurchaseStatus::Completed | PurchaseStatus::Failed)) => status,
                Some(PurchaseStatus::Pending) => continue,
                None => {
                    warn!(
                        uid = %purchase.transaction_uid,
                        status = %remote.transaction_status,
                        "Unknown provider status, leaving purchase pending"
                    );
                    continue;
                }
            };

            if let Some(settled) = self.settler.settle(&purchase.transaction_uid, to).await? {
                status_changes.push(StatusChange {
                    transaction_uid: settled.transaction_uid,
                    from: purchase.status.into(),
                    to: settled.status.into(),
                    provider_status: remote.transaction_status.clone(),
                });
            }
        }

        Ok(SyncSummary {
            fetched,
            matched,
            unmatched_local,
            status_changes,
            synced_at,
        })
    }
}

/// Drives the Reconciler: startup, interval, and manual runs.
pub struct ReconcileRunner {
    reconciler: Reconciler,
    interval: Duration,
    fetch_limit: u32,
    sync_rx: SyncRequestReceiver,
    shutdown_rx: watch::Receiver<bool>,
}

impl ReconcileRunner {
    pub fn new(
        reconciler: Reconciler,
        interval: Duration,
        fetch_limit: u32,
        sync_rx: SyncRequestReceiver,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            reconciler,
            interval,
            fetch_limit,
            sync_rx,
            shutdown_rx,
        }
    }

    pub async fn run(mut self) {
        info!(interval = ?self.interval, "ReconcileRunner started");

        self.run_automatic("startup").await;

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("ReconcileRunner received shutdown signal");
                        break;
                    }
                }

                Some(request) = self.sync_rx.recv() => {
                    if self.run_manual(request).await {
                        // A manual run covers the next automatic one.
                        ticker.reset();
                    }
                }

                _ = ticker.tick() => {
                    self.run_automatic("interval").await;
                }
            }
        }

        info!("ReconcileRunner shutdown complete");
    }

    async fn run_automatic(&self, trigger: &'static str) {
        match self.reconciler.reconcile(self.fetch_limit).await {
            Ok(summary) => log_summary(trigger, &summary),
            Err(e) => error!(trigger, error = %e, "Reconciliation cycle failed"),
        }
    }

    /// Returns whether the run succeeded.
    async fn run_manual(&self, request: SyncRequest) -> bool {
        let limit = request.limit.unwrap_or(self.fetch_limit);
        let result = self.reconciler.reconcile(limit).await;
        let ok = result.is_ok();
        match &result {
            Ok(summary) => log_summary("manual", summary),
            Err(e) => warn!(error = %e, "Manual reconciliation failed"),
        }
        if request.reply.send(result).is_err() {
            debug!("Manual sync requester went away before the reply");
        }
        ok
    }
}

fn log_summary(trigger: &'static str, summary: &SyncSummary) {
    if summary.status_changes.is_empty() {
        debug!(
            trigger,
            fetched = summary.fetched,
            matched = summary.matched,
            "Reconciliation finished without changes"
        );
    } else {
        info!(
            trigger,
            fetched = summary.fetched,
            matched = summary.matched,
            unmatched_local = summary.unmatched_local,
            changed = summary.status_changes.len(),
            "Reconciliation applied status changes"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::collection::ListCollections;
    use crate::entities::token_purchase::GetTokenPurchaseByUid;
    use crate::entities::user::GetUserById;
    use crate::events::{purchase_status_channel, sync_request_channel};
    use crate::test_support::{FakeProvider, insert_purchase, insert_user, provider_tx, test_db};
    use bgp_sdk::objects::PurchaseStatus as SdkPurchaseStatus;
    use tokio::sync::oneshot;

    fn reconciler(db: &DatabaseProcessor, provider: Arc<FakeProvider>) -> Reconciler {
        let (status_tx, _) = purchase_status_channel();
        Reconciler::new(db.clone(), provider, Settler::new(db.clone(), status_tx))
    }

    #[tokio::test]
    async fn completed_collection_settles_pending_purchase() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com", 0).await;
        insert_purchase(&db, user.id, "abc123", 5000, 100).await;
        let provider = Arc::new(FakeProvider::with_transactions(vec![provider_tx(
            "abc123",
            "completed",
            "5000",
        )]));

        let summary = reconciler(&db, provider).reconcile(50).await.unwrap();
        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.unmatched_local, 0);
        assert_eq!(
            summary.status_changes,
            vec![StatusChange {
                transaction_uid: "abc123".into(),
                from: SdkPurchaseStatus::Pending,
                to: SdkPurchaseStatus::Completed,
                provider_status: "completed".into(),
            }]
        );

        let purchase = db
            .process(GetTokenPurchaseByUid {
                transaction_uid: "abc123".into(),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(purchase.status, PurchaseStatus::Completed);
        assert!(purchase.completed_at.is_some());
        let user = db.process(GetUserById { id: user.id }).await.unwrap().unwrap();
        assert_eq!(user.token_balance, 100);
    }

    #[tokio::test]
    async fn second_run_reports_no_changes() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com", 0).await;
        insert_purchase(&db, user.id, "abc123", 5000, 100).await;
        let provider = Arc::new(FakeProvider::with_transactions(vec![provider_tx(
            "abc123",
            "SUCCESSFUL",
            "5000",
        )]));
        let reconciler = reconciler(&db, provider);

        let first = reconciler.reconcile(50).await.unwrap();
        assert_eq!(first.status_changes.len(), 1);
        let second = reconciler.reconcile(50).await.unwrap();
        assert!(second.status_changes.is_empty());
        assert_eq!(second.matched, 0);

        let user = db.process(GetUserById { id: user.id }).await.unwrap().unwrap();
        assert_eq!(user.token_balance, 100);
    }

    #[tokio::test]
    async fn terminal_purchases_are_never_reverted() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com", 0).await;
        insert_purchase(&db, user.id, "abc123", 5000, 100).await;
        let provider = Arc::new(FakeProvider::with_transactions(vec![provider_tx(
            "abc123", "paid", "5000",
        )]));
        let reconciler = reconciler(&db, provider.clone());
        reconciler.reconcile(50).await.unwrap();

        provider.set_transactions(vec![provider_tx("abc123", "failed", "5000")]);
        let summary = reconciler.reconcile(50).await.unwrap();
        assert!(summary.status_changes.is_empty());

        let purchase = db
            .process(GetTokenPurchaseByUid {
                transaction_uid: "abc123".into(),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(purchase.status, PurchaseStatus::Completed);
    }

    #[tokio::test]
    async fn pending_and_unknown_statuses_change_nothing() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com", 0).await;
        insert_purchase(&db, user.id, "p1", 5000, 100).await;
        insert_purchase(&db, user.id, "p2", 5000, 100).await;
        insert_purchase(&db, user.id, "p3", 5000, 100).await;
        let provider = Arc::new(FakeProvider::with_transactions(vec![
            provider_tx("p1", "processing", "5000"),
            provider_tx("p2", "on_hold", "5000"),
            provider_tx("remote-only", "completed", "100"),
        ]));

        let summary = reconciler(&db, provider).reconcile(50).await.unwrap();
        assert_eq!(summary.fetched, 3);
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.unmatched_local, 1);
        assert!(summary.status_changes.is_empty());

        let mirrored = db
            .process(ListCollections {
                limit: 10,
                offset: 0,
            })
            .await
            .unwrap();
        assert_eq!(mirrored.len(), 3);
        let unknown = mirrored
            .iter()
            .find(|c| c.transaction_uid == "p2")
            .unwrap();
        assert_eq!(unknown.local_status, None);
    }

    #[tokio::test]
    async fn newest_entry_wins_for_repeated_uid() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com", 0).await;
        insert_purchase(&db, user.id, "abc123", 5000, 100).await;
        let provider = Arc::new(FakeProvider::with_transactions(vec![
            provider_tx("abc123", "completed", "5000"),
            provider_tx("abc123", "failed", "5000"),
        ]));

        let summary = reconciler(&db, provider).reconcile(50).await.unwrap();
        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.status_changes.len(), 1);
        assert_eq!(summary.status_changes[0].to, SdkPurchaseStatus::Completed);
        assert_eq!(summary.status_changes[0].provider_status, "completed");

        let purchase = db
            .process(GetTokenPurchaseByUid {
                transaction_uid: "abc123".into(),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(purchase.status, PurchaseStatus::Completed);

        let mirrored = db
            .process(ListCollections {
                limit: 10,
                offset: 0,
            })
            .await
            .unwrap();
        assert_eq!(mirrored.len(), 1);
        assert_eq!(mirrored[0].status, "completed");
    }

    #[tokio::test]
    async fn provider_failure_is_returned() {
        let db = test_db().await;
        let provider = Arc::new(FakeProvider::default());
        provider.fail_list(true);

        let result = reconciler(&db, provider).reconcile(50).await;
        assert!(matches!(result, Err(ReconcileError::Provider(_))));
    }

    #[tokio::test]
    async fn runner_answers_manual_requests() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com", 0).await;
        insert_purchase(&db, user.id, "abc123", 5000, 100).await;
        let provider = Arc::new(FakeProvider::default());
        let (sync_tx, sync_rx) = sync_request_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = ReconcileRunner::new(
            reconciler(&db, provider.clone()),
            Duration::from_secs(3600),
            50,
            sync_rx,
            shutdown_rx,
        );
        let handle = tokio::spawn(runner.run());

        provider.set_transactions(vec![provider_tx("abc123", "completed", "5000")]);
        let (reply, response) = oneshot::channel();
        sync_tx
            .send(SyncRequest {
                limit: Some(10),
                reply,
            })
            .await
            .unwrap();
        let summary = response.await.unwrap().unwrap();
        // The startup run may already have settled it if it saw the update.
        assert!(summary.status_changes.len() <= 1);
        let purchase = db
            .process(GetTokenPurchaseByUid {
                transaction_uid: "abc123".into(),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(purchase.status, PurchaseStatus::Completed);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
