//! Token balances and the admin purchases dashboard.
//!
//! # Endpoints
//!
//! - `GET /balance`                 – caller's token balance (user)
//! - `GET /admin/purchases`         – filtered, sorted page with stats (admin)
//! - `GET /admin/purchases/export`  – the same selection as CSV, all pages (admin)

use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
};
use bgp_core::dashboard::{PurchaseFilter, PurchaseSort, build_page, filter_and_sort, to_csv};
use bgp_core::entities::token_purchase::{ListRecentTokenPurchases, TokenPurchase};
use bgp_sdk::objects::TokenBalanceResponse;
use bgp_sdk::objects::admin::{ListPurchasesQuery, clamp_window};
use kanau::processor::Processor;

use crate::api::error::{ApiError, ApiQuery};
use crate::api::extractors::{AdminAuth, UserAuth};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/balance", get(get_balance))
        .route("/admin/purchases", get(list_purchases))
        .route("/admin/purchases/export", get(export_purchases))
}

async fn get_balance(UserAuth(user): UserAuth) -> impl IntoResponse {
    Json(TokenBalanceResponse {
        balance: user.token_balance,
    })
}

async fn load_window(
    state: &AppState,
    query: &ListPurchasesQuery,
) -> Result<Vec<TokenPurchase>, ApiError> {
    Ok(state
        .db
        .process(ListRecentTokenPurchases {
            limit: clamp_window(query.window),
        })
        .await?)
}

async fn list_purchases(
    State(state): State<AppState>,
    _auth: AdminAuth,
    ApiQuery(query): ApiQuery<ListPurchasesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let records = load_window(&state, &query).await?;
    Ok(Json(build_page(records, &query)))
}

async fn export_purchases(
    State(state): State<AppState>,
    _auth: AdminAuth,
    ApiQuery(query): ApiQuery<ListPurchasesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let records = load_window(&state, &query).await?;
    let selected = filter_and_sort(
        records,
        &PurchaseFilter::from_query(&query),
        PurchaseSort {
            field: query.sort_by,
            direction: query.sort_dir,
        },
    );
    tracing::info!(rows = selected.len(), "Exporting purchases");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"token-purchases.csv\"",
            ),
        ],
        to_csv(&selected),
    ))
}
