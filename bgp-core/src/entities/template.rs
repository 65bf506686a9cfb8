use crate::framework::DatabaseProcessor;
use bgp_sdk::objects::catalog::TemplateResponse;
use kanau::processor::Processor;
use sqlx::types::Json;

/// A label sheet layout: a grid of `grid_rows` by `grid_columns` labels.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Template {
    pub id: i64,
    pub user_id: i64,
    pub device_id: Option<i64>,
    pub name: String,
    pub grid_rows: i64,
    pub grid_columns: i64,
    pub field_bindings: Json<Vec<String>>,
    pub created_at: i64,
}

const TEMPLATE_COLUMNS: &str =
    "id, user_id, device_id, name, grid_rows, grid_columns, field_bindings, created_at";

impl From<Template> for TemplateResponse {
    fn from(value: Template) -> Self {
        TemplateResponse {
            id: value.id,
            device_id: value.device_id,
            name: value.name,
            rows: u32::try_from(value.grid_rows).unwrap_or_default(),
            columns: u32::try_from(value.grid_columns).unwrap_or_default(),
            field_bindings: value.field_bindings.0,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateTemplate {
    pub user_id: i64,
    pub device_id: Option<i64>,
    pub name: String,
    pub grid_rows: u32,
    pub grid_columns: u32,
    pub field_bindings: Vec<String>,
    pub created_at: i64,
}

impl Processor<CreateTemplate> for DatabaseProcessor {
    type Output = Template;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CreateTemplate")]
    async fn process(&self, cmd: CreateTemplate) -> Result<Template, sqlx::Error> {
        let sql = format!(
            "INSERT INTO templates \
             (user_id, device_id, name, grid_rows, grid_columns, field_bindings, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {TEMPLATE_COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&sql)
            .bind(cmd.user_id)
            .bind(cmd.device_id)
            .bind(cmd.name)
            .bind(i64::from(cmd.grid_rows))
            .bind(i64::from(cmd.grid_columns))
            .bind(Json(cmd.field_bindings))
            .bind(cmd.created_at)
            .fetch_one(&self.pool)
            .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ListTemplatesForUser {
    pub user_id: i64,
}

impl Processor<ListTemplatesForUser> for DatabaseProcessor {
    type Output = Vec<Template>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListTemplatesForUser")]
    async fn process(&self, query: ListTemplatesForUser) -> Result<Vec<Template>, sqlx::Error> {
        let sql =
            format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE user_id = ? ORDER BY id ASC");
        sqlx::query_as::<_, Template>(&sql)
            .bind(query.user_id)
            .fetch_all(&self.pool)
            .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetTemplateForUser {
    pub user_id: i64,
    pub template_id: i64,
}

impl Processor<GetTemplateForUser> for DatabaseProcessor {
    type Output = Option<Template>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetTemplateForUser")]
    async fn process(&self, query: GetTemplateForUser) -> Result<Option<Template>, sqlx::Error> {
        let sql = format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = ? AND user_id = ?");
        sqlx::query_as::<_, Template>(&sql)
            .bind(query.template_id)
            .bind(query.user_id)
            .fetch_optional(&self.pool)
            .await
    }
}
