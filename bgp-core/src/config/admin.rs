//! Operator credentials for the `Bgp-Admin-Authorization` header.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use std::sync::Arc;

/// Argon2 PHC string of the operator secret.
///
/// Cloning shares the string, so `AdminAuth` can move a copy onto a
/// blocking thread for verification.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub secret_hash: Arc<str>,
}

impl AdminConfig {
    pub fn new(secret_hash: impl Into<Arc<str>>) -> Self {
        Self {
            secret_hash: secret_hash.into(),
        }
    }

    /// Whether a config value is already an argon2 PHC string rather than a
    /// plaintext secret waiting to be hashed.
    pub fn is_argon2_hash(value: &str) -> bool {
        PasswordHash::new(value).is_ok_and(|hash| {
            hash.algorithm.as_str().starts_with("argon2") && hash.hash.is_some()
        })
    }

    /// Empty candidates never match.
    pub fn verify_secret(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        match PasswordHash::new(&self.secret_hash) {
            Ok(hash) => Argon2::default()
                .verify_password(candidate.as_bytes(), &hash)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored admin secret is not a valid PHC string");
                false
            }
        }
    }
}
