use crate::framework::DatabaseProcessor;
use bgp_sdk::objects::catalog::DeviceResponse;
use kanau::processor::Processor;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Device {
    pub id: i64,
    pub user_id: i64,
    pub device_type: String,
    pub model_code: String,
    pub serial_pattern: String,
    pub created_at: i64,
}

const DEVICE_COLUMNS: &str = "id, user_id, device_type, model_code, serial_pattern, created_at";

impl From<Device> for DeviceResponse {
    fn from(value: Device) -> Self {
        DeviceResponse {
            id: value.id,
            device_type: value.device_type,
            model_code: value.model_code,
            serial_pattern: value.serial_pattern,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateDevice {
    pub user_id: i64,
    pub device_type: String,
    pub model_code: String,
    pub serial_pattern: String,
    pub created_at: i64,
}

impl Processor<CreateDevice> for DatabaseProcessor {
    type Output = Device;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CreateDevice")]
    async fn process(&self, cmd: CreateDevice) -> Result<Device, sqlx::Error> {
        let sql = format!(
            "INSERT INTO devices (user_id, device_type, model_code, serial_pattern, created_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {DEVICE_COLUMNS}"
        );
        sqlx::query_as::<_, Device>(&sql)
            .bind(cmd.user_id)
            .bind(cmd.device_type)
            .bind(cmd.model_code)
            .bind(cmd.serial_pattern)
            .bind(cmd.created_at)
            .fetch_one(&self.pool)
            .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ListDevicesForUser {
    pub user_id: i64,
}

impl Processor<ListDevicesForUser> for DatabaseProcessor {
    type Output = Vec<Device>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListDevicesForUser")]
    async fn process(&self, query: ListDevicesForUser) -> Result<Vec<Device>, sqlx::Error> {
        let sql = format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE user_id = ? ORDER BY id ASC");
        sqlx::query_as::<_, Device>(&sql)
            .bind(query.user_id)
            .fetch_all(&self.pool)
            .await
    }
}

#[derive(Debug, Clone, Copy)]
/// A device, only if owned by the given user.
pub struct GetDeviceForUser {
    pub user_id: i64,
    pub device_id: i64,
}

impl Processor<GetDeviceForUser> for DatabaseProcessor {
    type Output = Option<Device>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetDeviceForUser")]
    async fn process(&self, query: GetDeviceForUser) -> Result<Option<Device>, sqlx::Error> {
        let sql = format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = ? AND user_id = ?");
        sqlx::query_as::<_, Device>(&sql)
            .bind(query.device_id)
            .bind(query.user_id)
            .fetch_optional(&self.pool)
            .await
    }
}
