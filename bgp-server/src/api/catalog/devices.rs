use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use bgp_core::entities::device::{CreateDevice, ListDevicesForUser};
use bgp_core::layout::SerialPattern;
use bgp_core::utils::now_unix;
use bgp_sdk::objects::catalog::{CreateDeviceRequest, DeviceResponse};
use kanau::processor::Processor;

use super::required_text;
use crate::api::error::{ApiError, ApiJson};
use crate::api::extractors::UserAuth;
use crate::state::AppState;

pub(super) async fn list_devices(
    State(state): State<AppState>,
    UserAuth(user): UserAuth,
) -> Result<impl IntoResponse, ApiError> {
    let devices = state
        .db
        .process(ListDevicesForUser { user_id: user.id })
        .await?;
    let body: Vec<DeviceResponse> = devices.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

pub(super) async fn create_device(
    State(state): State<AppState>,
    UserAuth(user): UserAuth,
    ApiJson(request): ApiJson<CreateDeviceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let device_type = required_text("device_type", &request.device_type)?;
    let model_code = required_text("model_code", &request.model_code)?;
    let serial_pattern = required_text("serial_pattern", &request.serial_pattern)?;
    SerialPattern::parse(&serial_pattern)?;

    let device = state
        .db
        .process(CreateDevice {
            user_id: user.id,
            device_type,
            model_code,
            serial_pattern,
            created_at: now_unix(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(DeviceResponse::from(device))))
}
