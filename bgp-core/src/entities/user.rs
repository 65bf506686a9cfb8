use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use ring::rand::SecureRandom;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub api_token_hash: String,
    pub token_balance: i64,
    pub created_at: i64,
}

const USER_COLUMNS: &str = "id, email, api_token_hash, token_balance, created_at";

/// SHA-256 of an API token as lowercase hex. Only this digest is stored.
pub fn hash_api_token(token: &str) -> String {
    let digest = ring::digest::digest(&ring::digest::SHA256, token.as_bytes());
    digest
        .as_ref()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// A new random API token, returned to the caller once.
pub fn generate_api_token() -> Result<String, ring::error::Unspecified> {
    let mut bytes = [0u8; 32];
    ring::rand::SystemRandom::new().fill(&mut bytes)?;
    Ok(format!(
        "bgp_{}",
        fast32::base64::RFC4648_URL_NOPAD.encode(&bytes)
    ))
}

impl User {
    pub async fn credit_tokens_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        user_id: i64,
        tokens: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET token_balance = token_balance + ? WHERE id = ?")
            .bind(tokens)
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub api_token_hash: String,
    pub initial_tokens: i64,
    pub created_at: i64,
}

impl Processor<CreateUser> for DatabaseProcessor {
    type Output = User;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CreateUser")]
    async fn process(&self, cmd: CreateUser) -> Result<User, sqlx::Error> {
        let sql = format!(
            "INSERT INTO users (email, api_token_hash, token_balance, created_at) \
             VALUES (?, ?, ?, ?) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(cmd.email)
            .bind(cmd.api_token_hash)
            .bind(cmd.initial_tokens)
            .bind(cmd.created_at)
            .fetch_one(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetUserByTokenHash {
    pub api_token_hash: String,
}

impl Processor<GetUserByTokenHash> for DatabaseProcessor {
    type Output = Option<User>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetUserByTokenHash")]
    async fn process(&self, query: GetUserByTokenHash) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE api_token_hash = ?");
        sqlx::query_as::<_, User>(&sql)
            .bind(query.api_token_hash)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetUserById {
    pub id: i64,
}

impl Processor<GetUserById> for DatabaseProcessor {
    type Output = Option<User>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetUserById")]
    async fn process(&self, query: GetUserById) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        sqlx::query_as::<_, User>(&sql)
            .bind(query.id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Take tokens from a balance only if it covers the whole amount.
///
/// Returns the new balance, or `None` when the balance is insufficient.
pub struct DebitTokens {
    pub user_id: i64,
    pub amount: i64,
}

impl Processor<DebitTokens> for DatabaseProcessor {
    type Output = Option<i64>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DebitTokens")]
    async fn process(&self, cmd: DebitTokens) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE users
            SET token_balance = token_balance - ?1
            WHERE id = ?2 AND token_balance >= ?1
            RETURNING token_balance
            "#,
        )
        .bind(cmd.amount)
        .bind(cmd.user_id)
        .fetch_optional(&self.pool)
        .await
    }
}
