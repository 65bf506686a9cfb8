use axum::{Json, extract::State, response::IntoResponse};
use bgp_core::entities::token_purchase::GetTokenPurchaseByUid;
use bgp_sdk::objects::{PaymentEnvironment, PurchaseResponse, TestPaymentRequest};
use kanau::processor::Processor;

use crate::api::error::{ApiError, ApiJson};
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

/// `POST /api/payments/test-payment`: settle a pending purchase by hand.
///
/// Sandbox only; in production this is `403`.
pub(super) async fn test_payment(
    State(state): State<AppState>,
    _auth: AdminAuth,
    ApiJson(request): ApiJson<TestPaymentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if state.payment_environment().await? != PaymentEnvironment::Sandbox {
        return Err(ApiError::Forbidden(
            "test payments are only available in the sandbox environment",
        ));
    }
    if !request.outcome.is_terminal() {
        return Err(ApiError::BadRequest(
            "outcome must be completed or failed".into(),
        ));
    }

    if let Some(settled) = state
        .settler
        .settle(&request.transaction_uid, request.outcome.into())
        .await?
    {
        tracing::info!(
            uid = %settled.transaction_uid,
            status = ?settled.status,
            "Test payment applied"
        );
        return Ok(Json(PurchaseResponse::from(settled)));
    }

    let existing = state
        .db
        .process(GetTokenPurchaseByUid {
            transaction_uid: request.transaction_uid,
        })
        .await?;
    match existing {
        Some(purchase) => Err(ApiError::Conflict(format!(
            "purchase is already {}",
            bgp_sdk::objects::PurchaseStatus::from(purchase.status).as_str()
        ))),
        None => Err(ApiError::NotFound("purchase not found")),
    }
}
