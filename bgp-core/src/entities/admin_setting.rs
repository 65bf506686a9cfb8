//! Key/value admin settings, currently the payment configuration.

use crate::framework::DatabaseProcessor;
use bgp_sdk::objects::{PaymentEnvironment, PaymentSettingsResponse, UpdatePaymentSettings};
use kanau::processor::Processor;

pub const PAYMENT_ENVIRONMENT_KEY: &str = "payment_environment";
pub const WEBHOOK_URL_KEY: &str = "webhook_url";
pub const PRODUCTION_TOKEN_KEY: &str = "production_token";

/// Payment settings as stored. Absent keys fall back to the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentSettings {
    pub environment: Option<PaymentEnvironment>,
    pub webhook_url: Option<String>,
    pub production_token: Option<String>,
}

impl PaymentSettings {
    pub fn effective_environment(&self, default: PaymentEnvironment) -> PaymentEnvironment {
        self.environment.unwrap_or(default)
    }

    pub fn to_response(&self, default: PaymentEnvironment) -> PaymentSettingsResponse {
        let hint = self.production_token.as_ref().map(|token| {
            let chars: Vec<char> = token.chars().collect();
            let start = chars.len().saturating_sub(4);
            chars[start..].iter().collect::<String>()
        });
        PaymentSettingsResponse {
            environment: self.effective_environment(default),
            webhook_url: self.webhook_url.clone(),
            production_token_set: self.production_token.is_some(),
            production_token_hint: hint,
        }
    }
}

async fn read_setting(
    executor: impl sqlx::SqliteExecutor<'_>,
    key: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT value FROM admin_settings WHERE key = ?")
        .bind(key)
        .fetch_optional(executor)
        .await
}

/// Write `value`, or remove the key when `value` is empty.
async fn write_setting(
    executor: impl sqlx::SqliteExecutor<'_>,
    key: &str,
    value: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    if value.is_empty() {
        sqlx::query("DELETE FROM admin_settings WHERE key = ?")
            .bind(key)
            .execute(executor)
            .await?;
    } else {
        sqlx::query(
            r#"
            INSERT INTO admin_settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(executor)
        .await?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct LoadPaymentSettings;

impl Processor<LoadPaymentSettings> for DatabaseProcessor {
    type Output = PaymentSettings;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:LoadPaymentSettings")]
    async fn process(&self, _: LoadPaymentSettings) -> Result<PaymentSettings, sqlx::Error> {
        let environment = read_setting(&self.pool, PAYMENT_ENVIRONMENT_KEY).await?;
        let environment = match environment {
            Some(raw) => match raw.parse::<PaymentEnvironment>() {
                Ok(env) => Some(env),
                Err(error) => {
                    tracing::warn!(%error, "Ignoring stored payment environment");
                    None
                }
            },
            None => None,
        };
        Ok(PaymentSettings {
            environment,
            webhook_url: read_setting(&self.pool, WEBHOOK_URL_KEY).await?,
            production_token: read_setting(&self.pool, PRODUCTION_TOKEN_KEY).await?,
        })
    }
}

#[derive(Debug, Clone)]
/// Apply a partial update in one transaction and return the stored result.
pub struct SavePaymentSettings {
    pub update: UpdatePaymentSettings,
    pub now: i64,
}

impl Processor<SavePaymentSettings> for DatabaseProcessor {
    type Output = PaymentSettings;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:SavePaymentSettings")]
    async fn process(&self, cmd: SavePaymentSettings) -> Result<PaymentSettings, sqlx::Error> {
        let SavePaymentSettings { update, now } = cmd;
        let mut tx = self.pool.begin().await?;
        if let Some(environment) = update.environment {
            write_setting(&mut *tx, PAYMENT_ENVIRONMENT_KEY, environment.as_str(), now).await?;
        }
        if let Some(webhook_url) = update.webhook_url.as_deref() {
            write_setting(&mut *tx, WEBHOOK_URL_KEY, webhook_url.trim(), now).await?;
        }
        if let Some(token) = update.production_token.as_deref() {
            write_setting(&mut *tx, PRODUCTION_TOKEN_KEY, token.trim(), now).await?;
        }
        tx.commit().await?;
        self.process(LoadPaymentSettings).await
    }
}
