use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use bgp_core::entities::device::GetDeviceForUser;
use bgp_core::entities::template::{CreateTemplate, ListTemplatesForUser};
use bgp_core::layout::Grid;
use bgp_core::utils::now_unix;
use bgp_sdk::objects::catalog::{CreateTemplateRequest, TemplateResponse};
use kanau::processor::Processor;

use super::required_text;
use crate::api::error::{ApiError, ApiJson};
use crate::api::extractors::UserAuth;
use crate::state::AppState;

/// Most fields a label may bind.
const MAX_FIELD_BINDINGS: usize = 32;

pub(super) async fn list_templates(
    State(state): State<AppState>,
    UserAuth(user): UserAuth,
) -> Result<impl IntoResponse, ApiError> {
    let templates = state
        .db
        .process(ListTemplatesForUser { user_id: user.id })
        .await?;
    let body: Vec<TemplateResponse> = templates.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

pub(super) async fn create_template(
    State(state): State<AppState>,
    UserAuth(user): UserAuth,
    ApiJson(request): ApiJson<CreateTemplateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = required_text("name", &request.name)?;
    let grid = Grid::new(request.rows, request.columns)?;
    let field_bindings = normalize_bindings(request.field_bindings)?;

    if let Some(device_id) = request.device_id {
        state
            .db
            .process(GetDeviceForUser {
                user_id: user.id,
                device_id,
            })
            .await?
            .ok_or(ApiError::NotFound("device not found"))?;
    }

    let template = state
        .db
        .process(CreateTemplate {
            user_id: user.id,
            device_id: request.device_id,
            name,
            grid_rows: grid.rows,
            grid_columns: grid.columns,
            field_bindings,
            created_at: now_unix(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(TemplateResponse::from(template))))
}

/// Trim bindings and drop duplicates, keeping first-seen order.
fn normalize_bindings(raw: Vec<String>) -> Result<Vec<String>, ApiError> {
    let mut bindings: Vec<String> = Vec::with_capacity(raw.len());
    for binding in raw {
        let binding = required_text("field binding", &binding)?;
        if !bindings.contains(&binding) {
            bindings.push(binding);
        }
    }
    if bindings.is_empty() {
        return Err(ApiError::BadRequest(
            "a template needs at least one field binding".into(),
        ));
    }
    if bindings.len() > MAX_FIELD_BINDINGS {
        return Err(ApiError::BadRequest(format!(
            "at most {MAX_FIELD_BINDINGS} field bindings"
        )));
    }
    Ok(bindings)
}
