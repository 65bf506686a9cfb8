use axum::{Json, extract::State, response::IntoResponse};
use bgp_core::entities::admin_setting::{LoadPaymentSettings, SavePaymentSettings};
use bgp_core::utils::now_unix;
use bgp_sdk::objects::{PaymentEnvironment, UpdatePaymentSettings};
use kanau::processor::Processor;
use url::Url;

use crate::api::error::{ApiError, ApiJson};
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

/// `GET /api/payments/admin/payment-settings`
pub(super) async fn get_payment_settings(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Result<impl IntoResponse, ApiError> {
    let settings = state.db.process(LoadPaymentSettings).await?;
    let default = state.config.provider.read().await.default_environment;
    Ok(Json(settings.to_response(default)))
}

/// `PUT /api/payments/admin/payment-settings`
///
/// Stores the update and swaps the provider endpoint right away. Switching
/// to production without any production key is rejected.
pub(super) async fn update_payment_settings(
    State(state): State<AppState>,
    _auth: AdminAuth,
    ApiJson(update): ApiJson<UpdatePaymentSettings>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(webhook_url) = update
        .webhook_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
    {
        let parsed = Url::parse(webhook_url)
            .map_err(|e| ApiError::BadRequest(format!("invalid webhook_url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::BadRequest(
                "webhook_url must be an http(s) URL".into(),
            ));
        }
    }

    let current = state.db.process(LoadPaymentSettings).await?;
    {
        let provider = state.config.provider.read().await;
        let environment = update
            .environment
            .unwrap_or_else(|| current.effective_environment(provider.default_environment));
        let token = match update.production_token.as_deref().map(str::trim) {
            Some(t) => Some(t).filter(|t| !t.is_empty()),
            None => current.production_token.as_deref(),
        };
        if environment == PaymentEnvironment::Production
            && provider.endpoint(environment, token).is_none()
        {
            return Err(ApiError::BadRequest(
                "production requires a production token".into(),
            ));
        }
    }

    state
        .db
        .process(SavePaymentSettings {
            update,
            now: now_unix(),
        })
        .await?;
    let settings = state.refresh_provider_endpoint().await?;
    let default = state.config.provider.read().await.default_environment;
    let response = settings.to_response(default);
    tracing::info!(
        environment = response.environment.as_str(),
        production_token_set = response.production_token_set,
        "Payment settings updated"
    );
    Ok(Json(response))
}
