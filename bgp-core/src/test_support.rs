#![allow(clippy::unwrap_used)]
//! Shared fixtures for database and provider tests.

use crate::entities::token_purchase::{TokenPurchase, TokenPurchaseInsert};
use crate::entities::user::{CreateUser, User, hash_api_token};
use crate::entities::{CountryCode, CurrencyCode, PaymentNetwork};
use crate::framework::DatabaseProcessor;
use crate::provider::{
    CollectionWindow, InitiateCollection, InitiatedCollection, PaymentProvider, ProviderError,
};
use async_trait::async_trait;
use bgp_sdk::objects::ProviderTransaction;
use kanau::processor::Processor;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Fresh in-memory database with all migrations applied.
///
/// A single connection keeps every query on the same in-memory database.
pub async fn test_db() -> DatabaseProcessor {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("../migrations").run(&pool).await.unwrap();
    DatabaseProcessor { pool }
}

/// The plaintext API token `insert_user` derives the stored hash from.
pub fn api_token_for(email: &str) -> String {
    format!("token-{email}")
}

pub async fn insert_user(db: &DatabaseProcessor, email: &str, balance: i64) -> User {
    db.process(CreateUser {
        email: email.to_owned(),
        api_token_hash: hash_api_token(&api_token_for(email)),
        initial_tokens: balance,
        created_at: 1_000,
    })
    .await
    .unwrap()
}

/// A pending UGX purchase paid with MTN.
pub async fn insert_purchase(
    db: &DatabaseProcessor,
    user_id: i64,
    uid: &str,
    amount_ugx: i64,
    tokens: i64,
) -> TokenPurchase {
    let mut tx = db.pool.begin().await.unwrap();
    let purchase = TokenPurchase::insert_tx(
        &mut tx,
        TokenPurchaseInsert {
            user_id,
            transaction_uid: uid.to_owned(),
            plan_id: "starter".to_owned(),
            amount_ugx,
            tokens,
            provider: PaymentNetwork::Mtn,
            phone_number: "+256771234567".to_owned(),
            local_country: CountryCode::Ug,
            local_currency: CurrencyCode::Ugx,
            local_amount_minor: amount_ugx,
            created_at: 1_000,
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
    purchase
}

pub fn provider_tx(uid: &str, status: &str, amount: &str) -> ProviderTransaction {
    ProviderTransaction {
        app_transaction_uid: uid.to_owned(),
        transaction_status: status.to_owned(),
        total_amount: amount.to_owned(),
        debit_phone_number: Some("256771234567".to_owned()),
        currency: Some("UGX".to_owned()),
        provider: Some("MTN".to_owned()),
        description: None,
        reference: None,
        created_at: None,
    }
}

/// In-memory aggregator.
#[derive(Default)]
pub struct FakeProvider {
    transactions: Mutex<Vec<ProviderTransaction>>,
    initiated: Mutex<Vec<InitiateCollection>>,
    fail_initiate: AtomicBool,
    fail_list: AtomicBool,
}

impl FakeProvider {
    pub fn with_transactions(transactions: Vec<ProviderTransaction>) -> Self {
        Self {
            transactions: Mutex::new(transactions),
            ..Default::default()
        }
    }

    pub fn set_transactions(&self, transactions: Vec<ProviderTransaction>) {
        *self.transactions.lock().unwrap() = transactions;
    }

    pub fn initiated(&self) -> Vec<InitiateCollection> {
        self.initiated.lock().unwrap().clone()
    }

    pub fn fail_initiate(&self, fail: bool) {
        self.fail_initiate.store(fail, Ordering::SeqCst);
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }
}

fn unavailable() -> ProviderError {
    ProviderError::Status {
        status: 503,
        body: "unavailable".to_owned(),
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn initiate_collection(
        &self,
        request: InitiateCollection,
    ) -> Result<InitiatedCollection, ProviderError> {
        if self.fail_initiate.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let payment_url = format!("https://pay.example/{}", request.app_transaction_uid);
        self.initiated.lock().unwrap().push(request);
        Ok(InitiatedCollection {
            payment_url: Some(payment_url),
            reference: Some("OPT-REF".to_owned()),
            transaction_status: Some("pending".to_owned()),
        })
    }

    async fn list_collections(
        &self,
        window: CollectionWindow,
    ) -> Result<Vec<ProviderTransaction>, ProviderError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        let all = self.transactions.lock().unwrap();
        Ok(all
            .iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .cloned()
            .collect())
    }

    async fn get_collection(
        &self,
        transaction_uid: &str,
    ) -> Result<Option<ProviderTransaction>, ProviderError> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.app_transaction_uid == transaction_uid)
            .cloned())
    }
}
