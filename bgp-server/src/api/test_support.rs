#![allow(clippy::unwrap_used)]
//! Router fixtures: an in-memory database, test config and request helpers.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bgp_core::config::{
    AdminConfig, ConfigStore, CurrencyConfig, OutboxConfig, PricingConfig, ProviderConfig,
    ReconcileConfig, ServerConfig,
};
use bgp_core::entities::token_purchase::{TokenPurchase, TokenPurchaseInsert};
use bgp_core::entities::user::{CreateUser, User, hash_api_token};
use bgp_core::entities::{CountryCode, CurrencyCode, PaymentNetwork};
use bgp_core::events::{
    EventSenders, PurchaseQueuedReceiver, SyncRequestReceiver, purchase_queued_channel,
    purchase_status_channel, sync_request_channel,
};
use bgp_core::framework::DatabaseProcessor;
use bgp_core::provider::OptimusClient;
use bgp_sdk::objects::{PaymentEnvironment, TokenPlan};
use bgp_sdk::signature::ADMIN_AUTH_HEADER;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePoolOptions;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tower::ServiceExt;
use url::Url;

use crate::config::{LoadedConfig, hash_secret};
use crate::server::build_router;
use crate::state::AppState;

pub const ADMIN_SECRET: &str = "admin-secret";
pub const WEBHOOK_SECRET: &str = "webhook-secret";

static ADMIN_HASH: LazyLock<String> = LazyLock::new(|| hash_secret(ADMIN_SECRET).unwrap());

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    /// Kept so sends from `subscribe` succeed; drained by tests that care.
    pub queued_rx: PurchaseQueuedReceiver,
    /// Handed to a `ReconcileRunner` by tests that need one.
    pub sync_rx: Option<SyncRequestReceiver>,
}

pub fn loaded_config(sandbox_base_url: &str) -> LoadedConfig {
    LoadedConfig {
        server: ServerConfig {
            listen: "127.0.0.1:0".parse().unwrap(),
        },
        admin: AdminConfig::new(ADMIN_HASH.clone()),
        provider: ProviderConfig {
            sandbox_base_url: Url::parse(sandbox_base_url).unwrap(),
            production_base_url: Url::parse("https://live.optimus.example/api").unwrap(),
            sandbox_api_key: "sandbox-key".into(),
            production_api_key: None,
            webhook_secret: WEBHOOK_SECRET.into(),
            default_environment: PaymentEnvironment::Sandbox,
            request_timeout: Duration::from_secs(5),
        },
        pricing: PricingConfig {
            plans: vec![
                TokenPlan {
                    id: "starter".into(),
                    name: "Starter".into(),
                    tokens: 100,
                    price_ugx: 5000,
                },
                TokenPlan {
                    id: "pro".into(),
                    name: "Pro".into(),
                    tokens: 1000,
                    price_ugx: 40000,
                },
            ],
            currency: CurrencyConfig {
                kes_per_ugx: Decimal::from_str("0.035").unwrap(),
            },
        },
        reconcile: ReconcileConfig::default(),
        outbox: OutboxConfig::default(),
    }
}

pub async fn test_app() -> TestApp {
    test_app_with_provider("https://sandbox.optimus.example/api").await
}

pub async fn test_app_with_provider(sandbox_base_url: &str) -> TestApp {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("../migrations").run(&pool).await.unwrap();
    let db = DatabaseProcessor { pool };

    let (queued_tx, queued_rx) = purchase_queued_channel();
    let (sync_tx, sync_rx) = sync_request_channel();
    let (status_tx, _) = purchase_status_channel();
    let events = EventSenders::new(queued_tx, sync_tx, status_tx);

    let endpoint = ConfigStore::new(None);
    let provider = Arc::new(OptimusClient::new(reqwest::Client::new(), endpoint.clone()));
    let state = AppState::new(
        db,
        loaded_config(sandbox_base_url).into_shared(),
        events,
        endpoint,
        provider,
    );
    state.refresh_provider_endpoint().await.unwrap();

    TestApp {
        router: build_router(state.clone()),
        state,
        queued_rx,
        sync_rx: Some(sync_rx),
    }
}

impl TestApp {
    /// A user whose bearer token is `token-{email}`.
    pub async fn user(&self, email: &str, balance: i64) -> (User, String) {
        let token = format!("token-{email}");
        let user = self
            .state
            .db
            .process(CreateUser {
                email: email.to_owned(),
                api_token_hash: hash_api_token(&token),
                initial_tokens: balance,
                created_at: 1_000,
            })
            .await
            .unwrap();
        (user, token)
    }

    /// A pending UGX purchase paid with MTN.
    pub async fn purchase(
        &self,
        user_id: i64,
        uid: &str,
        amount_ugx: i64,
        tokens: i64,
    ) -> TokenPurchase {
        let mut tx = self.state.db.pool.begin().await.unwrap();
        let purchase = TokenPurchase::insert_tx(
            &mut tx,
            TokenPurchaseInsert {
                user_id,
                transaction_uid: uid.to_owned(),
                plan_id: "starter".into(),
                amount_ugx,
                tokens,
                provider: PaymentNetwork::Mtn,
                phone_number: "+256771234567".into(),
                local_country: CountryCode::Ug,
                local_currency: CurrencyCode::Ugx,
                local_amount_minor: amount_ugx,
                created_at: 2_000,
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        purchase
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let (status, body) = self.send_raw(request).await;
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    pub async fn send_raw(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }
}

pub fn get(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(uri)
}

pub fn json_request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
}

pub trait AuthExt {
    fn bearer(self, token: &str) -> Self;
    fn admin(self) -> Self;
}

impl AuthExt for axum::http::request::Builder {
    fn bearer(self, token: &str) -> Self {
        self.header("authorization", format!("Bearer {token}"))
    }

    fn admin(self) -> Self {
        self.header(ADMIN_AUTH_HEADER, ADMIN_SECRET)
    }
}

pub fn empty() -> Body {
    Body::empty()
}

pub fn json_body(value: serde_json::Value) -> Body {
    Body::from(value.to_string())
}
