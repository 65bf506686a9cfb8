use crate::entities::{CountryCode, CurrencyCode, PaymentNetwork, PurchaseStatus};
use crate::framework::DatabaseProcessor;
use bgp_sdk::objects::{Currency, PurchaseResponse};
use kanau::processor::Processor;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TokenPurchase {
    pub id: i64,
    pub user_id: i64,
    pub transaction_uid: String,
    pub plan_id: String,
    pub amount_ugx: i64,
    pub tokens: i64,
    pub provider: PaymentNetwork,
    pub phone_number: String,
    pub status: PurchaseStatus,
    pub payment_url: Option<String>,
    pub provider_reference: Option<String>,
    pub local_country: CountryCode,
    pub local_currency: CurrencyCode,
    pub local_amount_minor: i64,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

const PURCHASE_COLUMNS: &str = "id, user_id, transaction_uid, plan_id, amount_ugx, tokens, \
    provider, phone_number, status, payment_url, provider_reference, local_country, \
    local_currency, local_amount_minor, created_at, completed_at";

impl TokenPurchase {
    /// Amount charged in the payer's currency.
    pub fn local_amount(&self) -> Decimal {
        let currency: Currency = self.local_currency.into();
        Decimal::new(self.local_amount_minor, currency.minor_digits())
    }
}

impl From<TokenPurchase> for PurchaseResponse {
    fn from(value: TokenPurchase) -> Self {
        let local_amount = value.local_amount();
        PurchaseResponse {
            id: value.id,
            user_id: value.user_id,
            transaction_uid: value.transaction_uid,
            plan_id: value.plan_id,
            amount_ugx: value.amount_ugx,
            tokens: value.tokens,
            provider: value.provider.into(),
            phone_number: value.phone_number,
            status: value.status.into(),
            payment_url: value.payment_url,
            local_country: value.local_country.into(),
            local_currency: value.local_currency.into(),
            local_amount,
            created_at: value.created_at,
            completed_at: value.completed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPurchaseInsert {
    pub user_id: i64,
    pub transaction_uid: String,
    pub plan_id: String,
    pub amount_ugx: i64,
    pub tokens: i64,
    pub provider: PaymentNetwork,
    pub phone_number: String,
    pub local_country: CountryCode,
    pub local_currency: CurrencyCode,
    pub local_amount_minor: i64,
    pub created_at: i64,
}

impl TokenPurchase {
    /// Insert a new pending purchase inside a transaction.
    pub async fn insert_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        insert: TokenPurchaseInsert,
    ) -> Result<TokenPurchase, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO token_purchases
                (user_id, transaction_uid, plan_id, amount_ugx, tokens, provider, phone_number,
                 status, local_country, local_currency, local_amount_minor, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?, ?)
            RETURNING {PURCHASE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, TokenPurchase>(&sql)
            .bind(insert.user_id)
            .bind(insert.transaction_uid)
            .bind(insert.plan_id)
            .bind(insert.amount_ugx)
            .bind(insert.tokens)
            .bind(insert.provider)
            .bind(insert.phone_number)
            .bind(insert.local_country)
            .bind(insert.local_currency)
            .bind(insert.local_amount_minor)
            .bind(insert.created_at)
            .fetch_one(&mut **tx)
            .await
    }

    /// Move a pending purchase to a terminal status.
    ///
    /// Returns `None` when the purchase does not exist or is no longer pending,
    /// so a terminal record is never rewritten.
    pub async fn transition_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        transaction_uid: &str,
        to: PurchaseStatus,
        now: i64,
    ) -> Result<Option<TokenPurchase>, sqlx::Error> {
        if to == PurchaseStatus::Pending {
            return Ok(None);
        }
        let completed_at = (to == PurchaseStatus::Completed).then_some(now);
        let sql = format!(
            r#"
            UPDATE token_purchases
            SET status = ?, completed_at = ?
            WHERE transaction_uid = ? AND status = 'pending'
            RETURNING {PURCHASE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, TokenPurchase>(&sql)
            .bind(to)
            .bind(completed_at)
            .bind(transaction_uid)
            .fetch_optional(&mut **tx)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetTokenPurchaseByUid {
    pub transaction_uid: String,
}

impl Processor<GetTokenPurchaseByUid> for DatabaseProcessor {
    type Output = Option<TokenPurchase>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetTokenPurchaseByUid")]
    async fn process(
        &self,
        query: GetTokenPurchaseByUid,
    ) -> Result<Option<TokenPurchase>, sqlx::Error> {
        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM token_purchases WHERE transaction_uid = ?");
        sqlx::query_as::<_, TokenPurchase>(&sql)
            .bind(query.transaction_uid)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetTokenPurchaseById {
    pub id: i64,
}

impl Processor<GetTokenPurchaseById> for DatabaseProcessor {
    type Output = Option<TokenPurchase>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetTokenPurchaseById")]
    async fn process(
        &self,
        query: GetTokenPurchaseById,
    ) -> Result<Option<TokenPurchase>, sqlx::Error> {
        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM token_purchases WHERE id = ?");
        sqlx::query_as::<_, TokenPurchase>(&sql)
            .bind(query.id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// The most recent purchases across all users, newest first.
pub struct ListRecentTokenPurchases {
    pub limit: u32,
}

impl Processor<ListRecentTokenPurchases> for DatabaseProcessor {
    type Output = Vec<TokenPurchase>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListRecentTokenPurchases")]
    async fn process(
        &self,
        query: ListRecentTokenPurchases,
    ) -> Result<Vec<TokenPurchase>, sqlx::Error> {
        let sql = format!(
            "SELECT {PURCHASE_COLUMNS} FROM token_purchases ORDER BY created_at DESC, id DESC LIMIT ?"
        );
        sqlx::query_as::<_, TokenPurchase>(&sql)
            .bind(i64::from(query.limit))
            .fetch_all(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Pending purchases whose transaction UID is in the given set.
pub struct ListPendingPurchasesByUids {
    pub transaction_uids: Vec<String>,
}

impl Processor<ListPendingPurchasesByUids> for DatabaseProcessor {
    type Output = Vec<TokenPurchase>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListPendingPurchasesByUids")]
    async fn process(
        &self,
        query: ListPendingPurchasesByUids,
    ) -> Result<Vec<TokenPurchase>, sqlx::Error> {
        if query.transaction_uids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new(format!(
            "SELECT {PURCHASE_COLUMNS} FROM token_purchases WHERE status = 'pending' AND transaction_uid IN ("
        ));
        let mut separated = query_builder.separated(", ");
        for uid in query.transaction_uids {
            separated.push_bind(uid);
        }
        separated.push_unseparated(") ORDER BY id ASC");

        query_builder
            .build_query_as::<TokenPurchase>()
            .fetch_all(&self.pool)
            .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CountPendingPurchases;

impl Processor<CountPendingPurchases> for DatabaseProcessor {
    type Output = i64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CountPendingPurchases")]
    async fn process(&self, _: CountPendingPurchases) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM token_purchases WHERE status = 'pending'",
        )
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Store what the aggregator returned when the payment prompt was sent.
pub struct RecordPaymentPrompt {
    pub purchase_id: i64,
    pub payment_url: Option<String>,
    pub provider_reference: Option<String>,
}

impl Processor<RecordPaymentPrompt> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:RecordPaymentPrompt")]
    async fn process(&self, cmd: RecordPaymentPrompt) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE token_purchases
            SET payment_url = COALESCE(?, payment_url),
                provider_reference = COALESCE(?, provider_reference)
            WHERE id = ?
            "#,
        )
        .bind(cmd.payment_url)
        .bind(cmd.provider_reference)
        .bind(cmd.purchase_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
