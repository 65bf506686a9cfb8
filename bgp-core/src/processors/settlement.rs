//! Moving purchases out of `pending`.
//!
//! Reconciliation, the provider webhook and the sandbox test call all settle
//! through here, so the token credit and the status broadcast happen the same
//! way regardless of who noticed the payment.

use crate::entities::PurchaseStatus;
use crate::entities::token_purchase::TokenPurchase;
use crate::entities::user::User;
use crate::events::{PurchaseStatusChanged, PurchaseStatusSender};
use crate::framework::DatabaseProcessor;
use crate::utils::now_unix;
use kanau::processor::Processor;
use tracing::{debug, info};

#[derive(Debug, Clone)]
/// Transition a pending purchase and credit its tokens on completion.
///
/// Both writes share one transaction. Returns `None` when the purchase is
/// unknown or already terminal; nothing is written in that case.
pub struct SettlePurchase {
    pub transaction_uid: String,
    pub to: PurchaseStatus,
    pub now: i64,
}

impl Processor<SettlePurchase> for DatabaseProcessor {
    type Output = Option<TokenPurchase>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:SettlePurchase")]
    async fn process(&self, cmd: SettlePurchase) -> Result<Option<TokenPurchase>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let Some(purchase) =
            TokenPurchase::transition_tx(&mut tx, &cmd.transaction_uid, cmd.to, cmd.now).await?
        else {
            return Ok(None);
        };
        if purchase.status == PurchaseStatus::Completed {
            User::credit_tokens_tx(&mut tx, purchase.user_id, purchase.tokens).await?;
        }
        tx.commit().await?;
        Ok(Some(purchase))
    }
}

/// Settles purchases and announces the result to status listeners.
#[derive(Clone)]
pub struct Settler {
    db: DatabaseProcessor,
    status_tx: PurchaseStatusSender,
}

impl Settler {
    pub fn new(db: DatabaseProcessor, status_tx: PurchaseStatusSender) -> Self {
        Self { db, status_tx }
    }

    pub async fn settle(
        &self,
        transaction_uid: &str,
        to: PurchaseStatus,
    ) -> Result<Option<TokenPurchase>, sqlx::Error> {
        let settled = self
            .db
            .process(SettlePurchase {
                transaction_uid: transaction_uid.to_owned(),
                to,
                now: now_unix(),
            })
            .await?;

        match &settled {
            Some(purchase) => {
                info!(
                    uid = %purchase.transaction_uid,
                    status = ?purchase.status,
                    tokens = purchase.tokens,
                    "Purchase settled"
                );
                // No subscribers is fine.
                let _ = self.status_tx.send(PurchaseStatusChanged {
                    purchase_id: purchase.id,
                    transaction_uid: purchase.transaction_uid.clone(),
                    status: purchase.status,
                });
            }
            None => debug!(uid = transaction_uid, "Purchase not pending, settlement skipped"),
        }
        Ok(settled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user::GetUserById;
    use crate::events::purchase_status_channel;
    use crate::test_support::{insert_purchase, insert_user, test_db};

    #[tokio::test]
    async fn completion_credits_tokens_exactly_once() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com", 10).await;
        insert_purchase(&db, user.id, "abc123", 5000, 100).await;
        let (status_tx, mut status_rx) = purchase_status_channel();
        let settler = Settler::new(db.clone(), status_tx);

        let first = settler
            .settle("abc123", PurchaseStatus::Completed)
            .await
            .unwrap()
            .unwrap();
        assert!(first.completed_at.is_some());
        let second = settler
            .settle("abc123", PurchaseStatus::Completed)
            .await
            .unwrap();
        assert!(second.is_none());

        let user = db.process(GetUserById { id: user.id }).await.unwrap().unwrap();
        assert_eq!(user.token_balance, 110);

        let event = status_rx.try_recv().unwrap();
        assert_eq!(event.transaction_uid, "abc123");
        assert_eq!(event.status, PurchaseStatus::Completed);
        assert!(status_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failure_credits_nothing() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com", 0).await;
        insert_purchase(&db, user.id, "abc123", 5000, 100).await;

        let failed = db
            .process(SettlePurchase {
                transaction_uid: "abc123".into(),
                to: PurchaseStatus::Failed,
                now: 5,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(failed.status, PurchaseStatus::Failed);
        assert_eq!(failed.completed_at, None);

        let user = db.process(GetUserById { id: user.id }).await.unwrap().unwrap();
        assert_eq!(user.token_balance, 0);
    }
}
