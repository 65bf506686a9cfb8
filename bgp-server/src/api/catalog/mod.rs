//! Catalog API handlers. All endpoints are user-authenticated and scoped to
//! the caller, except the shared feature board.
//!
//! # Endpoints
//!
//! - `GET|POST /features`               – feature board
//! - `POST     /features/{id}/upvote`   – one vote per user
//! - `GET|POST /devices`                – the caller's devices
//! - `GET|POST /templates`              – the caller's label templates
//! - `POST     /barcodes/layout`        – place labels, paid in tokens

use axum::{
    Router,
    routing::{get, post},
};

use crate::api::error::ApiError;
use crate::state::AppState;

mod devices;
mod features;
mod layout;
mod templates;

/// Longest free-text field accepted by catalog endpoints.
const MAX_TEXT_LEN: usize = 200;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/features",
            get(features::list_features).post(features::create_feature),
        )
        .route(
            "/features/{feature_id}/upvote",
            post(features::upvote_feature),
        )
        .route(
            "/devices",
            get(devices::list_devices).post(devices::create_device),
        )
        .route(
            "/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route("/barcodes/layout", post(layout::create_layout))
}

/// Trimmed value of a required text field.
fn required_text(field: &'static str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "{field} must not be empty"
        )));
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(ApiError::BadRequest(format!(
            "{field} must be at most {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(trimmed.to_owned())
}
