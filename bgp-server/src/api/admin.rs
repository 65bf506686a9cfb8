//! Admin API handlers.
//!
//! These endpoints require the `Bgp-Admin-Authorization` header with the
//! plaintext admin secret.
//!
//! # Endpoints
//!
//! - `POST  /users`          – provision a user and issue its API token
//! - `PATCH /features/{id}`  – move a feature request through triage

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{patch, post},
};
use bgp_core::entities::feature::UpdateFeatureStatus as UpdateFeatureStatusCmd;
use bgp_core::entities::user::{CreateUser, generate_api_token, hash_api_token};
use bgp_core::utils::now_unix;
use bgp_sdk::objects::admin::{CreateUserRequest, CreatedUserResponse};
use bgp_sdk::objects::catalog::{FeatureResponse, UpdateFeatureStatus};
use kanau::processor::Processor;

use crate::api::error::{ApiError, ApiJson, is_unique_violation};
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/features/{feature_id}", patch(update_feature_status))
}

async fn create_user(
    State(state): State<AppState>,
    _auth: AdminAuth,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = request.email.trim().to_lowercase();
    if !is_plausible_email(&email) {
        return Err(ApiError::BadRequest("invalid email address".into()));
    }
    if request.initial_tokens < 0 {
        return Err(ApiError::BadRequest("initial_tokens must not be negative".into()));
    }

    let api_token =
        generate_api_token().map_err(|_| ApiError::Internal("failed to generate API token"))?;
    let user = state
        .db
        .process(CreateUser {
            email,
            api_token_hash: hash_api_token(&api_token),
            initial_tokens: request.initial_tokens,
            created_at: now_unix(),
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("a user with this email already exists".into())
            } else {
                ApiError::Database(e)
            }
        })?;

    tracing::info!(user_id = user.id, "User created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedUserResponse {
            id: user.id,
            email: user.email,
            api_token,
            token_balance: user.token_balance,
        }),
    ))
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

async fn update_feature_status(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(feature_id): Path<i64>,
    ApiJson(request): ApiJson<UpdateFeatureStatus>,
) -> Result<impl IntoResponse, ApiError> {
    let feature = state
        .db
        .process(UpdateFeatureStatusCmd {
            feature_id,
            status: request.status.into(),
        })
        .await?
        .ok_or(ApiError::NotFound("feature not found"))?;
    Ok(Json(FeatureResponse::from(feature)))
}
