use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

/// A purchase intent waiting to be forwarded to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PurchaseOutboxEntry {
    pub id: i64,
    pub purchase_id: i64,
    pub attempts: i64,
    pub next_attempt_at: i64,
    pub delivered_at: Option<i64>,
    pub abandoned_at: Option<i64>,
    pub last_error: Option<String>,
}

const OUTBOX_COLUMNS: &str =
    "id, purchase_id, attempts, next_attempt_at, delivered_at, abandoned_at, last_error";

impl PurchaseOutboxEntry {
    /// Enqueue a purchase for immediate delivery. Must share the purchase's transaction.
    pub async fn insert_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        purchase_id: i64,
        now: i64,
    ) -> Result<PurchaseOutboxEntry, sqlx::Error> {
        let sql = format!(
            "INSERT INTO purchase_outbox (purchase_id, next_attempt_at) VALUES (?, ?) \
             RETURNING {OUTBOX_COLUMNS}"
        );
        sqlx::query_as::<_, PurchaseOutboxEntry>(&sql)
            .bind(purchase_id)
            .bind(now)
            .fetch_one(&mut **tx)
            .await
    }

    pub fn is_open(&self) -> bool {
        self.delivered_at.is_none() && self.abandoned_at.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
/// Open entries whose next attempt is due, oldest first.
pub struct GetDueOutboxEntries {
    pub now: i64,
    pub limit: u32,
}

impl Processor<GetDueOutboxEntries> for DatabaseProcessor {
    type Output = Vec<PurchaseOutboxEntry>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetDueOutboxEntries")]
    async fn process(
        &self,
        query: GetDueOutboxEntries,
    ) -> Result<Vec<PurchaseOutboxEntry>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {OUTBOX_COLUMNS}
            FROM purchase_outbox
            WHERE delivered_at IS NULL
              AND abandoned_at IS NULL
              AND next_attempt_at <= ?
            ORDER BY next_attempt_at ASC, id ASC
            LIMIT ?
            "#
        );
        sqlx::query_as::<_, PurchaseOutboxEntry>(&sql)
            .bind(query.now)
            .bind(i64::from(query.limit))
            .fetch_all(&self.pool)
            .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetOutboxEntryByPurchase {
    pub purchase_id: i64,
}

impl Processor<GetOutboxEntryByPurchase> for DatabaseProcessor {
    type Output = Option<PurchaseOutboxEntry>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOutboxEntryByPurchase")]
    async fn process(
        &self,
        query: GetOutboxEntryByPurchase,
    ) -> Result<Option<PurchaseOutboxEntry>, sqlx::Error> {
        let sql = format!("SELECT {OUTBOX_COLUMNS} FROM purchase_outbox WHERE purchase_id = ?");
        sqlx::query_as::<_, PurchaseOutboxEntry>(&sql)
            .bind(query.purchase_id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MarkOutboxDelivered {
    pub outbox_id: i64,
    pub now: i64,
}

impl Processor<MarkOutboxDelivered> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:MarkOutboxDelivered")]
    async fn process(&self, cmd: MarkOutboxDelivered) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE purchase_outbox
            SET delivered_at = ?, attempts = attempts + 1, last_error = NULL
            WHERE id = ? AND delivered_at IS NULL
            "#,
        )
        .bind(cmd.now)
        .bind(cmd.outbox_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
/// Count a failed delivery and either reschedule or abandon the entry.
pub struct RecordOutboxFailure {
    pub outbox_id: i64,
    pub error: String,
    pub next_attempt_at: i64,
    /// Set when the entry has used up its attempts.
    pub abandoned_at: Option<i64>,
}

impl Processor<RecordOutboxFailure> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:RecordOutboxFailure")]
    async fn process(&self, cmd: RecordOutboxFailure) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE purchase_outbox
            SET attempts = attempts + 1,
                last_error = ?,
                next_attempt_at = ?,
                abandoned_at = ?
            WHERE id = ? AND delivered_at IS NULL AND abandoned_at IS NULL
            "#,
        )
        .bind(cmd.error)
        .bind(cmd.next_attempt_at)
        .bind(cmd.abandoned_at)
        .bind(cmd.outbox_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_purchase, insert_user, test_db};

    #[tokio::test]
    async fn due_entries_respect_schedule_and_state() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com", 0).await;
        let first = insert_purchase(&db, user.id, "p1", 5000, 100).await;
        let second = insert_purchase(&db, user.id, "p2", 5000, 100).await;

        let mut tx = db.pool.begin().await.unwrap();
        let a = PurchaseOutboxEntry::insert_tx(&mut tx, first.id, 10).await.unwrap();
        let b = PurchaseOutboxEntry::insert_tx(&mut tx, second.id, 10).await.unwrap();
        tx.commit().await.unwrap();

        db.process(RecordOutboxFailure {
            outbox_id: b.id,
            error: "timeout".into(),
            next_attempt_at: 100,
            abandoned_at: None,
        })
        .await
        .unwrap();

        let due = db
            .process(GetDueOutboxEntries { now: 50, limit: 10 })
            .await
            .unwrap();
        assert_eq!(due, vec![a.clone()]);

        db.process(MarkOutboxDelivered {
            outbox_id: a.id,
            now: 60,
        })
        .await
        .unwrap();
        let due = db
            .process(GetDueOutboxEntries { now: 100, limit: 10 })
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, b.id);
        assert_eq!(due[0].attempts, 1);
        assert_eq!(due[0].last_error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn abandoned_entries_are_never_due() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com", 0).await;
        let purchase = insert_purchase(&db, user.id, "p1", 5000, 100).await;

        let mut tx = db.pool.begin().await.unwrap();
        let entry = PurchaseOutboxEntry::insert_tx(&mut tx, purchase.id, 0)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        db.process(RecordOutboxFailure {
            outbox_id: entry.id,
            error: "gave up".into(),
            next_attempt_at: 0,
            abandoned_at: Some(5),
        })
        .await
        .unwrap();

        let due = db
            .process(GetDueOutboxEntries {
                now: i64::MAX,
                limit: 10,
            })
            .await
            .unwrap();
        assert!(due.is_empty());
        let stored = db
            .process(GetOutboxEntryByPurchase {
                purchase_id: purchase.id,
            })
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.is_open());
    }
}
