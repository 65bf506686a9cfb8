use axum::{Json, extract::State, response::IntoResponse};
use bgp_core::entities::collection::ListCollections;
use bgp_core::events::SyncRequest;
use bgp_core::processors::{MAX_FETCH_LIMIT, ReconcileError};
use bgp_core::utils::now_unix;
use bgp_sdk::objects::CollectionResponse;
use kanau::processor::Processor;
use serde::Deserialize;
use tokio::sync::oneshot;

use crate::api::error::{ApiError, ApiQuery};
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

const DEFAULT_COLLECTIONS_PAGE: u32 = 50;

#[derive(Debug, Default, Deserialize)]
pub(super) struct SyncQuery {
    /// Overrides the configured fetch limit for this run.
    pub limit: Option<u32>,
}

/// `POST /api/payments/sync-with-optimus`: manual reconciliation.
///
/// Queued behind any run already in progress; answers once this run is done.
/// Provider failures are returned as `502`.
pub(super) async fn sync_with_provider(
    State(state): State<AppState>,
    _auth: AdminAuth,
    ApiQuery(query): ApiQuery<SyncQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if query
        .limit
        .is_some_and(|limit| !(1..=MAX_FETCH_LIMIT).contains(&limit))
    {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {MAX_FETCH_LIMIT}"
        )));
    }

    let (reply, response) = oneshot::channel();
    state
        .events
        .sync_request
        .send(SyncRequest {
            limit: query.limit,
            reply,
        })
        .await
        .map_err(|_| ReconcileError::RunnerUnavailable)?;

    let summary = response
        .await
        .map_err(|_| ReconcileError::RunnerUnavailable)??;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub(super) struct CollectionsQuery {
    #[serde(default = "default_collections_page")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_collections_page() -> u32 {
    DEFAULT_COLLECTIONS_PAGE
}

/// `GET /api/payments/collections`: the local mirror of aggregator
/// collections, each flagged with whether it is still fresh.
pub(super) async fn list_collections(
    State(state): State<AppState>,
    _auth: AdminAuth,
    ApiQuery(query): ApiQuery<CollectionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let freshness = state.config.reconcile.read().await.collection_freshness;
    let freshness_secs = i64::try_from(freshness.as_secs()).unwrap_or(i64::MAX);

    let collections = state
        .db
        .process(ListCollections {
            limit: query.limit.clamp(1, MAX_FETCH_LIMIT),
            offset: query.offset,
        })
        .await?;

    let now = now_unix();
    let body: Vec<CollectionResponse> = collections
        .into_iter()
        .map(|c| c.into_response(now, freshness_secs))
        .collect();
    Ok(Json(body))
}
