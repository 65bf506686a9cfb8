use axum::{Json, extract::State, response::IntoResponse};
use bgp_core::entities::device::GetDeviceForUser;
use bgp_core::entities::template::GetTemplateForUser;
use bgp_core::entities::user::DebitTokens;
use bgp_core::layout::{Grid, SerialSource, place_labels};
use bgp_sdk::objects::catalog::{BarcodeLayoutRequest, BarcodeLayoutResponse};
use kanau::processor::Processor;

use crate::api::error::{ApiError, ApiJson};
use crate::api::extractors::UserAuth;
use crate::state::AppState;

/// `POST /api/barcodes/layout`: place labels on the template's grid.
///
/// One token is debited per label, all or nothing. An insufficient balance
/// is `402` and nothing is laid out.
pub(super) async fn create_layout(
    State(state): State<AppState>,
    UserAuth(user): UserAuth,
    ApiJson(request): ApiJson<BarcodeLayoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let template = state
        .db
        .process(GetTemplateForUser {
            user_id: user.id,
            template_id: request.template_id,
        })
        .await?
        .ok_or(ApiError::NotFound("template not found"))?;

    let rows = u32::try_from(template.grid_rows)
        .map_err(|_| ApiError::Internal("stored grid rows out of range"))?;
    let columns = u32::try_from(template.grid_columns)
        .map_err(|_| ApiError::Internal("stored grid columns out of range"))?;
    let grid = Grid::new(rows, columns)?;

    let source = SerialSource::from_request(request.serials, request.count, request.start)?;
    let pattern = match (&source, template.device_id) {
        (SerialSource::Generated { .. }, None) => {
            return Err(ApiError::BadRequest(
                "template has no device to generate serials from; pass serials".into(),
            ));
        }
        (SerialSource::Generated { .. }, Some(device_id)) => {
            state
                .db
                .process(GetDeviceForUser {
                    user_id: user.id,
                    device_id,
                })
                .await?
                .ok_or(ApiError::NotFound("device not found"))?
                .serial_pattern
        }
        (SerialSource::Explicit(_), _) => String::new(),
    };
    let serials = source.resolve(&pattern)?;

    let cost =
        i64::try_from(serials.len()).map_err(|_| ApiError::Internal("label count overflow"))?;
    let remaining_balance = state
        .db
        .process(DebitTokens {
            user_id: user.id,
            amount: cost,
        })
        .await?
        .ok_or_else(|| {
            ApiError::PaymentRequired(format!(
                "insufficient tokens: layout needs {cost}, balance is {}",
                user.token_balance
            ))
        })?;

    let sheet = place_labels(serials, grid);
    tracing::info!(
        user_id = user.id,
        template_id = template.id,
        labels = cost,
        pages = sheet.pages,
        "Layout created"
    );

    Ok(Json(BarcodeLayoutResponse {
        template_id: template.id,
        rows: grid.rows,
        columns: grid.columns,
        field_bindings: template.field_bindings.0,
        pages: sheet.pages,
        labels: sheet.labels,
        tokens_spent: cost,
        remaining_balance,
    }))
}
