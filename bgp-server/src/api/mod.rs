//! HTTP API, mounted under `/api`.
//!
//! # Route groups
//!
//! - `/payments` – plans, purchases, webhook, reconciliation, payment settings
//! - `/tokens`   – balances and the purchases dashboard
//! - `/admin`    – user provisioning and feature triage
//! - `/features`, `/devices`, `/templates`, `/barcodes` – catalog
//!
//! User endpoints take `Authorization: Bearer <token>`; admin endpoints take
//! the `Bgp-Admin-Authorization` header with the plaintext admin secret.

use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod catalog;
pub mod error;
pub mod extractors;
pub mod payments;
pub mod tokens;

#[cfg(test)]
pub(crate) mod test_support;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/payments", payments::router())
        .nest("/tokens", tokens::router())
        .nest("/admin", admin::router())
        .merge(catalog::router())
}
