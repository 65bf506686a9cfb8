use crate::entities::PurchaseStatus;
use crate::framework::DatabaseProcessor;
use crate::provider::map_provider_status;
use bgp_sdk::objects::{CollectionResponse, ProviderTransaction};
use kanau::processor::Processor;

/// Local mirror of one aggregator collection.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Collection {
    pub transaction_uid: String,
    pub amount: String,
    pub currency: Option<String>,
    pub status: String,
    pub local_status: Option<PurchaseStatus>,
    pub provider: Option<String>,
    pub phone_number: Option<String>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub provider_created_at: Option<String>,
    pub synced_at: i64,
}

impl Collection {
    /// Mirror row for a transaction as reported by the aggregator.
    pub fn from_provider(remote: &ProviderTransaction, synced_at: i64) -> Self {
        Self {
            transaction_uid: remote.app_transaction_uid.clone(),
            amount: remote.total_amount.clone(),
            currency: remote.currency.clone(),
            status: remote.transaction_status.clone(),
            local_status: map_provider_status(&remote.transaction_status),
            provider: remote.provider.clone(),
            phone_number: remote.debit_phone_number.clone(),
            description: remote.description.clone(),
            reference: remote.reference.clone(),
            provider_created_at: remote.created_at.clone(),
            synced_at,
        }
    }

    pub fn is_fresh(&self, now: i64, freshness_secs: i64) -> bool {
        now - self.synced_at <= freshness_secs
    }

    pub fn into_response(self, now: i64, freshness_secs: i64) -> CollectionResponse {
        let is_fresh = self.is_fresh(now, freshness_secs);
        CollectionResponse {
            transaction_uid: self.transaction_uid,
            amount: self.amount,
            currency: self.currency,
            status: self.status,
            local_status: self.local_status.map(Into::into),
            provider: self.provider,
            phone_number: self.phone_number,
            description: self.description,
            reference: self.reference,
            provider_created_at: self.provider_created_at,
            synced_at: self.synced_at,
            is_fresh,
        }
    }
}

#[derive(Debug, Clone)]
/// Insert or refresh mirrored collections in a single statement.
pub struct UpsertCollections {
    pub collections: Vec<Collection>,
}

impl Processor<UpsertCollections> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertCollections")]
    async fn process(&self, cmd: UpsertCollections) -> Result<u64, sqlx::Error> {
        if cmd.collections.is_empty() {
            return Ok(0);
        }

        let mut query_builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
            "INSERT INTO collections \
            (transaction_uid, amount, currency, status, local_status, provider, phone_number, \
             description, reference, provider_created_at, synced_at) ",
        );

        query_builder.push_values(cmd.collections, |mut b, c| {
            b.push_bind(c.transaction_uid)
                .push_bind(c.amount)
                .push_bind(c.currency)
                .push_bind(c.status)
                .push_bind(c.local_status)
                .push_bind(c.provider)
                .push_bind(c.phone_number)
                .push_bind(c.description)
                .push_bind(c.reference)
                .push_bind(c.provider_created_at)
                .push_bind(c.synced_at);
        });

        query_builder.push(
            " ON CONFLICT (transaction_uid) DO UPDATE SET \
              amount = excluded.amount, \
              currency = excluded.currency, \
              status = excluded.status, \
              local_status = excluded.local_status, \
              provider = excluded.provider, \
              phone_number = excluded.phone_number, \
              description = excluded.description, \
              reference = excluded.reference, \
              provider_created_at = excluded.provider_created_at, \
              synced_at = excluded.synced_at",
        );

        let result = query_builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone, Copy)]
/// Most recently synced collections first.
pub struct ListCollections {
    pub limit: u32,
    pub offset: u32,
}

impl Processor<ListCollections> for DatabaseProcessor {
    type Output = Vec<Collection>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListCollections")]
    async fn process(&self, query: ListCollections) -> Result<Vec<Collection>, sqlx::Error> {
        sqlx::query_as::<_, Collection>(
            r#"
            SELECT transaction_uid, amount, currency, status, local_status, provider,
                   phone_number, description, reference, provider_created_at, synced_at
            FROM collections
            ORDER BY synced_at DESC, transaction_uid ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(i64::from(query.limit))
        .bind(i64::from(query.offset))
        .fetch_all(&self.pool)
        .await
    }
}
