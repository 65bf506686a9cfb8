//! Configuration module for bgp-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables. Also handles admin secret hashing.

pub mod file;
pub mod runtime;

use crate::config::file::FileConfig;
use crate::config::runtime::{
    AdminConfig, CurrencyConfig, OutboxConfig, PricingConfig, ProviderConfig, ReconcileConfig,
    ServerConfig, SharedConfig,
};
use bgp_core::processors::MAX_FETCH_LIMIT;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

/// Shortest reconciliation interval accepted from the config file.
const MIN_RECONCILE_INTERVAL_SECS: u64 = 5;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("password hashing error: {0}")]
    HashError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub provider: ProviderConfig,
    pub pricing: PricingConfig,
    pub reconcile: ReconcileConfig,
    pub outbox: OutboxConfig,
}

impl LoadedConfig {
    /// Convert into a SharedConfig with Arc<RwLock<T>> wrappers.
    pub fn into_shared(self) -> SharedConfig {
        SharedConfig {
            server: Arc::new(RwLock::new(self.server)),
            admin: Arc::new(RwLock::new(self.admin)),
            provider: Arc::new(RwLock::new(self.provider)),
            pricing: Arc::new(RwLock::new(self.pricing)),
            reconcile: Arc::new(RwLock::new(self.reconcile)),
            outbox: Arc::new(RwLock::new(self.outbox)),
        }
    }
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Hash the admin secret if it's plaintext (and rewrite the file)
    /// 5. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;

        let secret_hash = if file_config.is_admin_secret_hashed() {
            file_config.admin.secret.clone()
        } else {
            let hash = hash_secret(&file_config.admin.secret)?;
            file_config.admin.secret = hash.clone();
            self.rewrite_config(&file_config)?;
            tracing::info!("Admin secret hashed and config file updated");
            hash
        };

        Ok(build_loaded_config(file_config, secret_hash))
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn rewrite_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write atomically: write to temp file, then rename
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.plans.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one [[plans]] entry is required".into(),
        ));
    }

    let mut seen = HashSet::new();
    for plan in &config.plans {
        if plan.id.trim().is_empty() {
            return Err(ConfigError::ValidationError("plan id must not be empty".into()));
        }
        if !seen.insert(plan.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate plan id {}",
                plan.id
            )));
        }
        if plan.price_ugx <= 0 || plan.tokens <= 0 {
            return Err(ConfigError::ValidationError(format!(
                "plan {} must have a positive price and token count",
                plan.id
            )));
        }
    }

    if config.reconciliation.interval_secs < MIN_RECONCILE_INTERVAL_SECS {
        return Err(ConfigError::ValidationError(format!(
            "reconciliation.interval_secs must be at least {MIN_RECONCILE_INTERVAL_SECS}"
        )));
    }
    if !(1..=MAX_FETCH_LIMIT).contains(&config.reconciliation.fetch_limit) {
        return Err(ConfigError::ValidationError(format!(
            "reconciliation.fetch_limit must be between 1 and {MAX_FETCH_LIMIT}"
        )));
    }
    if config.outbox.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "outbox.max_attempts must be at least 1".into(),
        ));
    }
    if config.currency.kes_per_ugx.is_sign_negative() || config.currency.kes_per_ugx.is_zero() {
        return Err(ConfigError::ValidationError(
            "currency.kes_per_ugx must be positive".into(),
        ));
    }
    if config.provider.webhook_secret.is_empty() {
        return Err(ConfigError::ValidationError(
            "provider.webhook_secret must not be empty".into(),
        ));
    }

    Ok(())
}

pub(crate) fn hash_secret(plaintext: &str) -> Result<String, ConfigError> {
    use argon2::{
        Argon2, PasswordHasher,
        password_hash::{SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ConfigError::HashError(e.to_string()))
}

fn build_loaded_config(file_config: FileConfig, secret_hash: String) -> LoadedConfig {
    let provider = file_config.provider;
    let reconciliation = file_config.reconciliation;

    LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
        },
        admin: AdminConfig::new(secret_hash),
        provider: ProviderConfig {
            sandbox_base_url: provider.sandbox_base_url,
            production_base_url: provider.production_base_url,
            sandbox_api_key: provider.sandbox_api_key,
            production_api_key: provider.production_api_key.filter(|k| !k.is_empty()),
            webhook_secret: provider.webhook_secret,
            default_environment: provider.default_environment,
            request_timeout: Duration::from_secs(provider.request_timeout_secs),
        },
        pricing: PricingConfig {
            plans: file_config.plans,
            currency: CurrencyConfig {
                kes_per_ugx: file_config.currency.kes_per_ugx,
            },
        },
        reconcile: ReconcileConfig {
            interval: Duration::from_secs(reconciliation.interval_secs),
            fetch_limit: reconciliation.fetch_limit,
            collection_freshness: Duration::from_secs(reconciliation.collection_freshness_secs),
        },
        outbox: OutboxConfig {
            max_attempts: file_config.outbox.max_attempts,
            retry_scan: Duration::from_secs(file_config.outbox.retry_scan_secs),
        },
    }
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const CONFIG: &str = r#"
[admin]
secret = "plain-admin-secret"

[provider]
sandbox_base_url = "https://sandbox.optimus.example/api/v1"
production_base_url = "https://optimus.example/api/v1"
sandbox_api_key = "sandbox-key"
webhook_secret = "hook-secret"

[reconciliation]
interval_secs = 15

[currency]
kes_per_ugx = "0.035"

[[plans]]
id = "starter"
name = "Starter"
tokens = 100
price_ugx = 5000
"#;

    fn write_config(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("bgp-config-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn parse(contents: &str) -> FileConfig {
        toml::from_str(contents).unwrap()
    }

    #[test]
    fn load_hashes_plaintext_secret_and_rewrites_file() {
        let path = write_config(CONFIG);
        let loaded = ConfigLoader::new(&path, None).load().unwrap();

        assert!(loaded.admin.verify_secret("plain-admin-secret"));
        assert!(!loaded.admin.verify_secret("wrong"));
        assert_eq!(loaded.reconcile.interval, Duration::from_secs(15));
        assert_eq!(loaded.pricing.plans.len(), 1);

        let rewritten = std::fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("$argon2"));
        assert!(!rewritten.contains("plain-admin-secret"));

        // A second load keeps the stored hash.
        let again = ConfigLoader::new(&path, None).load().unwrap();
        assert_eq!(again.admin.secret_hash, loaded.admin.secret_hash);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn listen_override_wins() {
        let path = write_config(CONFIG);
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        let loaded = ConfigLoader::new(&path, Some(addr)).load().unwrap();
        assert_eq!(loaded.server.listen, addr);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn rejects_missing_plans() {
        let mut config = parse(CONFIG);
        config.plans.clear();
        assert!(matches!(validate(&config), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn rejects_duplicate_plan_ids() {
        let mut config = parse(CONFIG);
        let copy = config.plans[0].clone();
        config.plans.push(copy);
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate plan id starter"));
    }

    #[test]
    fn rejects_non_positive_price() {
        let mut config = parse(CONFIG);
        config.plans[0].price_ugx = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_short_interval_and_bad_fetch_limit() {
        let mut config = parse(CONFIG);
        config.reconciliation.interval_secs = 4;
        assert!(validate(&config).is_err());

        let mut config = parse(CONFIG);
        config.reconciliation.fetch_limit = 0;
        assert!(validate(&config).is_err());

        config.reconciliation.fetch_limit = MAX_FETCH_LIMIT + 1;
        assert!(validate(&config).is_err());

        config.reconciliation.fetch_limit = MAX_FETCH_LIMIT;
        assert!(validate(&config).is_ok());
    }
}
