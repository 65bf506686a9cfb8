//! Payment API handlers.
//!
//! # Endpoints
//!
//! - `GET  /plans`                           – token plans on sale
//! - `POST /subscribe`                       – start a purchase (user)
//! - `GET  /status/{transaction_uid}`        – poll a purchase (owner)
//! - `GET  /status/{transaction_uid}/ws`     – WebSocket status stream (owner)
//! - `POST /webhook`                         – signed aggregator status push
//! - `POST /sync-with-optimus`               – manual reconciliation (admin)
//! - `GET  /collections`                     – mirrored aggregator collections (admin)
//! - `POST /test-payment`                    – sandbox-only manual settlement (admin)
//! - `GET|PUT /admin/payment-settings`       – payment environment and keys (admin)

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};

use crate::state::AppState;

mod reconcile;
mod settings;
mod status;
mod subscribe;
mod test_payment;
mod webhook;
mod ws;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/subscribe", post(subscribe::subscribe))
        .route(
            "/status/{transaction_uid}",
            get(status::get_purchase_status),
        )
        .route("/status/{transaction_uid}/ws", get(ws::purchase_status_ws))
        .route("/webhook", post(webhook::provider_webhook))
        .route("/sync-with-optimus", post(reconcile::sync_with_provider))
        .route("/collections", get(reconcile::list_collections))
        .route("/test-payment", post(test_payment::test_payment))
        .route(
            "/admin/payment-settings",
            get(settings::get_payment_settings).put(settings::update_payment_settings),
        )
}

/// `GET /api/payments/plans`
async fn list_plans(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.config.pricing.read().await.plans.clone())
}
