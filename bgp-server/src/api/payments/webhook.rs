use axum::{Json, extract::State, response::IntoResponse};
use bgp_core::entities::PurchaseStatus;
use bgp_core::entities::collection::{Collection, UpsertCollections};
use bgp_core::provider::map_provider_status;
use bgp_core::utils::now_unix;
use bgp_sdk::objects::ProviderTransaction;
use kanau::processor::Processor;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::extractors::SignedBody;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub(super) struct WebhookAck {
    pub transaction_uid: String,
    /// Whether a pending purchase was settled by this delivery.
    pub applied: bool,
}

/// `POST /api/payments/webhook`: aggregator status push.
///
/// Runs the same mapping and conditional transition as reconciliation, so
/// duplicate or late deliveries are harmless.
pub(super) async fn provider_webhook(
    State(state): State<AppState>,
    SignedBody(transaction): SignedBody<ProviderTransaction>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .process(UpsertCollections {
            collections: vec![Collection::from_provider(&transaction, now_unix())],
        })
        .await?;

    let uid = transaction.app_transaction_uid;
    let applied = match map_provider_status(&transaction.transaction_status) {
        Some(to @ (PurchaseStatus::Completed | PurchaseStatus::Failed)) => {
            state.settler.settle(&uid, to).await?.is_some()
        }
        Some(PurchaseStatus::Pending) => false,
        None => {
            tracing::warn!(
                uid = %uid,
                status = %transaction.transaction_status,
                "Webhook carried an unknown provider status"
            );
            false
        }
    };

    tracing::info!(uid = %uid, applied, "Provider webhook processed");
    Ok(Json(WebhookAck {
        transaction_uid: uid,
        applied,
    }))
}
