use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use bgp_core::entities::purchase_outbox::PurchaseOutboxEntry;
use bgp_core::entities::token_purchase::{TokenPurchase, TokenPurchaseInsert};
use bgp_core::events::PurchaseQueued;
use bgp_core::utils::{new_transaction_uid, now_unix};
use bgp_sdk::objects::{
    Country, PaymentNetwork, PurchaseStatus, SubscribeRequest, SubscribeResponse,
};
use bgp_sdk::phone::PhoneNumber;
use rust_decimal::Decimal;

use crate::api::error::{ApiError, ApiJson};
use crate::api::extractors::UserAuth;
use crate::state::AppState;

/// `POST /api/payments/subscribe`: start a token purchase.
///
/// The purchase and its outbox row are committed together; the collection
/// request itself is sent by the outbox forwarder. Responds `202 Accepted`.
pub(super) async fn subscribe(
    State(state): State<AppState>,
    UserAuth(user): UserAuth,
    ApiJson(request): ApiJson<SubscribeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let phone = PhoneNumber::parse(&request.phone)
        .map_err(|e| ApiError::BadRequest(format!("invalid phone number: {e}")))?;
    let country = phone.country();
    let provider = resolve_network(&phone, request.provider)?;

    let (plan, (currency, local_minor)) = {
        let pricing = state.config.pricing.read().await;
        let plan = pricing
            .plan(&request.plan_id)
            .cloned()
            .ok_or_else(|| ApiError::BadRequest(format!("unknown plan {}", request.plan_id)))?;
        let local = pricing
            .local_amount(plan.price_ugx, country)
            .ok_or_else(|| ApiError::BadRequest("price cannot be converted".into()))?;
        (plan, local)
    };

    let now = now_unix();
    let mut tx = state.db.pool.begin().await?;
    let purchase = TokenPurchase::insert_tx(
        &mut tx,
        TokenPurchaseInsert {
            user_id: user.id,
            transaction_uid: new_transaction_uid(),
            plan_id: plan.id.clone(),
            amount_ugx: plan.price_ugx,
            tokens: plan.tokens,
            provider: provider.into(),
            phone_number: phone.e164(),
            local_country: country.into(),
            local_currency: currency.into(),
            local_amount_minor: local_minor,
            created_at: now,
        },
    )
    .await?;
    PurchaseOutboxEntry::insert_tx(&mut tx, purchase.id, now).await?;
    tx.commit().await?;

    tracing::info!(
        uid = %purchase.transaction_uid,
        user_id = user.id,
        plan = %plan.id,
        provider = provider.label(),
        "Purchase queued"
    );

    if let Err(e) = state
        .events
        .purchase_queued
        .send(PurchaseQueued {
            purchase_id: purchase.id,
        })
        .await
    {
        // The retry scan still picks the outbox row up.
        tracing::warn!(
            error = %e,
            uid = %purchase.transaction_uid,
            "Outbox forwarder not listening"
        );
    }

    let amount = Decimal::new(local_minor, currency.minor_digits());
    let instructions = format!(
        "Approve the {} prompt on {} to pay {} {}.",
        provider.label(),
        purchase.phone_number,
        currency.code(),
        amount
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(SubscribeResponse {
            transaction_uid: purchase.transaction_uid,
            status: PurchaseStatus::Pending,
            plan_id: plan.id,
            tokens: plan.tokens,
            provider,
            phone_number: purchase.phone_number,
            amount,
            currency,
            instructions,
        }),
    ))
}

/// Pick the network to charge: the caller's choice, else the phone prefix.
fn resolve_network(
    phone: &PhoneNumber,
    requested: Option<PaymentNetwork>,
) -> Result<PaymentNetwork, ApiError> {
    let inferred = phone.network();
    let network = match (requested, inferred) {
        (Some(requested), Some(inferred)) if requested != inferred => {
            tracing::warn!(
                phone = %phone,
                requested = requested.label(),
                inferred = inferred.label(),
                "Requested network differs from phone prefix"
            );
            requested
        }
        (Some(requested), _) => requested,
        (None, Some(inferred)) => inferred,
        (None, None) => {
            return Err(ApiError::BadRequest(
                "cannot infer the mobile-money network from this number; pass provider".into(),
            ));
        }
    };

    if !operates_in(network, phone.country()) {
        return Err(ApiError::BadRequest(format!(
            "{} is not available for {} numbers",
            network.label(),
            phone.country().code()
        )));
    }
    Ok(network)
}

fn operates_in(network: PaymentNetwork, country: Country) -> bool {
    match network {
        PaymentNetwork::Mtn => country == Country::Uganda,
        PaymentNetwork::Mpesa => country == Country::Kenya,
        PaymentNetwork::Airtel => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone(raw: &str) -> PhoneNumber {
        PhoneNumber::parse(raw).unwrap()
    }

    #[test]
    fn network_is_inferred_from_prefix() {
        assert_eq!(
            resolve_network(&phone("+256771234567"), None).unwrap(),
            PaymentNetwork::Mtn
        );
        assert_eq!(
            resolve_network(&phone("+256700000000"), None).unwrap(),
            PaymentNetwork::Airtel
        );
        assert_eq!(
            resolve_network(&phone("+254712345678"), None).unwrap(),
            PaymentNetwork::Mpesa
        );
    }

    #[test]
    fn explicit_network_wins_over_prefix() {
        assert_eq!(
            resolve_network(&phone("+256771234567"), Some(PaymentNetwork::Airtel)).unwrap(),
            PaymentNetwork::Airtel
        );
    }

    #[test]
    fn unknown_prefix_requires_explicit_network() {
        assert!(resolve_network(&phone("+256601234567"), None).is_err());
        assert_eq!(
            resolve_network(&phone("+256601234567"), Some(PaymentNetwork::Mtn)).unwrap(),
            PaymentNetwork::Mtn
        );
    }

    #[test]
    fn mpesa_is_rejected_for_ugandan_numbers() {
        assert!(resolve_network(&phone("+256771234567"), Some(PaymentNetwork::Mpesa)).is_err());
    }
}
