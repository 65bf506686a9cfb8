//! Custom Axum extractors for request authentication.
//!
//! Provides:
//! - `UserAuth`: resolves `Authorization: Bearer <token>` to a user.
//! - `AdminAuth`: checks the `Bgp-Admin-Authorization` secret against the
//!   argon2 hash from the config file.
//! - `SignedBody<T>`: verifies the `Bgp-Signature` header against a signed
//!   JSON body (used by the provider webhook).
//!
//! All cryptographic operations are delegated to [`bgp_sdk::signature`].

use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use bgp_core::entities::user::{GetUserByTokenHash, User, hash_api_token};
use bgp_sdk::objects::ErrorResponse;
use bgp_sdk::signature::{
    ADMIN_AUTH_HEADER, SIGNATURE_HEADER, Signature, SignatureError, SignedObject,
};
use kanau::processor::Processor;

use super::error::ApiError;
use crate::state::AppState;

/// Largest webhook body accepted.
const MAX_SIGNED_BODY: usize = 1024 * 1024;

// ---------------------------------------------------------------------------
// UserAuth: API token
// ---------------------------------------------------------------------------

/// The authenticated caller.
pub struct UserAuth(pub User);

impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(ApiError::Unauthorized("missing Authorization header"))?
            .to_str()
            .map_err(|_| ApiError::Unauthorized("invalid Authorization header"))?
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthorized("expected a Bearer token"))?;

        let user = state
            .db
            .process(GetUserByTokenHash {
                api_token_hash: hash_api_token(token),
            })
            .await?
            .ok_or(ApiError::Unauthorized("invalid API token"))?;

        Ok(UserAuth(user))
    }
}

// ---------------------------------------------------------------------------
// AdminAuth: plaintext secret checked against the stored hash
// ---------------------------------------------------------------------------

pub struct AdminAuth;

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let secret = parts
            .headers
            .get(ADMIN_AUTH_HEADER)
            .ok_or(ApiError::Unauthorized("missing Bgp-Admin-Authorization header"))?
            .to_str()
            .map_err(|_| ApiError::Unauthorized("invalid Bgp-Admin-Authorization header"))?
            .to_owned();

        let admin = state.config.admin.read().await.clone();
        let verified = tokio::task::spawn_blocking(move || admin.verify_secret(&secret))
            .await
            .map_err(|_| ApiError::Internal("admin secret verification task failed"))?;

        if verified {
            Ok(AdminAuth)
        } else {
            Err(ApiError::Unauthorized("invalid admin secret"))
        }
    }
}

// ---------------------------------------------------------------------------
// SignedBody: webhook authentication via signed JSON body
// ---------------------------------------------------------------------------

/// An Axum extractor that verifies the `Bgp-Signature` header and
/// deserializes + authenticates the JSON request body.
///
/// # Header format
///
/// ```text
/// Bgp-Signature: {unix_timestamp}.{base64_signature}
/// ```
///
/// The signature is computed as `HMAC-SHA256("{timestamp}.{json_body}", webhook_secret)`.
pub struct SignedBody<T: Signature>(pub T);

/// Errors that can occur during signed-body verification.
#[derive(Debug, thiserror::Error)]
pub enum SignedBodyError {
    #[error("missing Bgp-Signature header")]
    MissingHeader,
    #[error("invalid Bgp-Signature header format")]
    InvalidHeader,
    #[error("invalid signature encoding")]
    InvalidBase64,
    #[error("failed to read request body")]
    BodyReadError,
    #[error("invalid JSON body: {0}")]
    JsonError(serde_json::Error),
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("signature expired")]
    Expired,
}

impl From<SignatureError> for SignedBodyError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::InvalidFormat => Self::InvalidHeader,
            SignatureError::InvalidBase64 => Self::InvalidBase64,
            SignatureError::Json(e) => Self::JsonError(e),
            SignatureError::SignatureMismatch => Self::VerificationFailed,
            SignatureError::Expired => Self::Expired,
        }
    }
}

impl IntoResponse for SignedBodyError {
    fn into_response(self) -> Response {
        let status = match self {
            SignedBodyError::MissingHeader
            | SignedBodyError::VerificationFailed
            | SignedBodyError::Expired => StatusCode::UNAUTHORIZED,
            SignedBodyError::InvalidHeader
            | SignedBodyError::InvalidBase64
            | SignedBodyError::BodyReadError
            | SignedBodyError::JsonError(_) => StatusCode::BAD_REQUEST,
        };
        let detail = self.to_string();
        (status, axum::Json(ErrorResponse { detail })).into_response()
    }
}

impl<T: Signature + Send> FromRequest<AppState> for SignedBody<T> {
    type Rejection = SignedBodyError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let header_value = req
            .headers()
            .get(SIGNATURE_HEADER)
            .ok_or(SignedBodyError::MissingHeader)?
            .to_str()
            .map_err(|_| SignedBodyError::InvalidHeader)?
            .to_owned();

        let body_bytes = axum::body::to_bytes(req.into_body(), MAX_SIGNED_BODY)
            .await
            .map_err(|_| SignedBodyError::BodyReadError)?;

        let json =
            String::from_utf8(body_bytes.to_vec()).map_err(|_| SignedBodyError::BodyReadError)?;

        let signed = SignedObject::<T>::from_header_and_body(&header_value, json)?;

        let provider = state.config.provider.read().await;
        let verified_body = signed.verify(provider.webhook_secret.as_bytes())?;
        drop(provider);

        Ok(SignedBody(verified_body))
    }
}
