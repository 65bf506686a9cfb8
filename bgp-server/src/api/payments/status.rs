use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use bgp_core::entities::PurchaseStatus;
use bgp_core::entities::token_purchase::{GetTokenPurchaseByUid, TokenPurchase};
use bgp_core::entities::user::User;
use bgp_core::framework::DatabaseProcessor;
use bgp_core::provider::map_provider_status;
use bgp_sdk::objects::PurchaseResponse;
use kanau::processor::Processor;
use tracing::warn;

use crate::api::error::ApiError;
use crate::api::extractors::UserAuth;
use crate::state::AppState;

/// Load a purchase owned by `user`. Other users' purchases look absent.
pub(super) async fn owned_purchase(
    db: &DatabaseProcessor,
    user: &User,
    transaction_uid: String,
) -> Result<Option<TokenPurchase>, sqlx::Error> {
    let purchase = db.process(GetTokenPurchaseByUid { transaction_uid }).await?;
    Ok(purchase.filter(|p| p.user_id == user.id))
}

/// `GET /api/payments/status/{transaction_uid}`: poll a purchase.
pub(super) async fn get_purchase_status(
    State(state): State<AppState>,
    UserAuth(user): UserAuth,
    Path(transaction_uid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let purchase = owned_purchase(&state.db, &user, transaction_uid)
        .await?
        .ok_or(ApiError::NotFound("purchase not found"))?;
    if purchase.status != PurchaseStatus::Pending {
        return Ok(Json(PurchaseResponse::from(purchase)));
    }
    let purchase = refresh_from_provider(&state, purchase).await?;
    Ok(Json(PurchaseResponse::from(purchase)))
}

/// Ask the aggregator about one pending purchase and settle it if finished.
///
/// Provider failures are logged and the local record is returned unchanged.
async fn refresh_from_provider(
    state: &AppState,
    purchase: TokenPurchase,
) -> Result<TokenPurchase, sqlx::Error> {
    let remote = match state.provider.get_collection(&purchase.transaction_uid).await {
        Ok(Some(remote)) => remote,
        Ok(None) => return Ok(purchase),
        Err(e) => {
            warn!(
                uid = %purchase.transaction_uid,
                error = %e,
                "Provider lookup failed, returning stored status"
            );
            return Ok(purchase);
        }
    };

    let to = match map_provider_status(&remote.transaction_status) {
        Some(status @ (PurchaseStatus::Completed | PurchaseStatus::Failed)) => status,
        _ => return Ok(purchase),
    };

    match state.settler.settle(&purchase.transaction_uid, to).await? {
        Some(settled) => Ok(settled),
        // Settled concurrently by a webhook or reconciliation run.
        None => Ok(state
            .db
            .process(GetTokenPurchaseByUid {
                transaction_uid: purchase.transaction_uid.clone(),
            })
            .await?
            .unwrap_or(purchase)),
    }
}
