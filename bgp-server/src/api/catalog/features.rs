use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bgp_core::entities::feature::{CreateFeature, ListFeatures, UpvoteFeature};
use bgp_core::utils::now_unix;
use bgp_sdk::objects::catalog::{CreateFeatureRequest, FeatureResponse};
use kanau::processor::Processor;

use super::required_text;
use crate::api::error::{ApiError, ApiJson};
use crate::api::extractors::UserAuth;
use crate::state::AppState;

/// Longest feature description.
const MAX_DESCRIPTION_LEN: usize = 4000;

pub(super) async fn list_features(
    State(state): State<AppState>,
    _auth: UserAuth,
) -> Result<impl IntoResponse, ApiError> {
    let features = state.db.process(ListFeatures).await?;
    let body: Vec<FeatureResponse> = features.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

pub(super) async fn create_feature(
    State(state): State<AppState>,
    UserAuth(user): UserAuth,
    ApiJson(request): ApiJson<CreateFeatureRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = required_text("title", &request.title)?;
    let description = request.description.trim().to_owned();
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ApiError::BadRequest(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }

    let feature = state
        .db
        .process(CreateFeature {
            title,
            description,
            submitted_by: Some(user.id),
            created_at: now_unix(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(FeatureResponse::from(feature))))
}

/// Repeated votes by the same user leave the count unchanged.
pub(super) async fn upvote_feature(
    State(state): State<AppState>,
    UserAuth(user): UserAuth,
    Path(feature_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let feature = state
        .db
        .process(UpvoteFeature {
            feature_id,
            user_id: user.id,
        })
        .await?
        .ok_or(ApiError::NotFound("feature not found"))?;
    Ok(Json(FeatureResponse::from(feature)))
}
