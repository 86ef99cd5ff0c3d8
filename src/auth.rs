//! Password hashing, session tokens, and the bearer-token extractor.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AuthSettings;
use crate::error::AppError;
use crate::state::AppState;

/// bcrypt is CPU-bound; keep it off the async workers.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(AppError::from)
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("password verification task failed: {e}")))?
        .map_err(AppError::from)
}

/// JWT session claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign an HS256 token for `user_id`, valid for `settings.token_ttl`.
pub fn issue_token(user_id: &str, settings: &AuthSettings) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        user_id: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + settings.token_ttl).timestamp(),
    };

    let key = EncodingKey::from_secret(settings.jwt_secret.as_bytes());
    encode(&Header::default(), &claims, &key)
        .map_err(|e| AppError::Internal(format!("create JWT: {e}")))
}

/// Check signature and expiry and return the claims.
pub fn verify_token(token: &str, settings: &AuthSettings) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(settings.jwt_secret.as_bytes());

    let data = decode::<Claims>(token, &key, &Validation::default()).map_err(|e| match e.kind() {
        ErrorKind::InvalidToken
        | ErrorKind::InvalidSignature
        | ErrorKind::ExpiredSignature
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => {
            debug!(error = %e, "Rejected session token");
            AppError::Unauthorized("Invalid token".to_string())
        }
        _ => AppError::Internal(format!("JWT verification: {e}")),
    })?;

    Ok(data.claims)
}

/// The authenticated caller, taken from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;

        let claims = verify_token(token, &state.auth)?;
        debug!(user_id = %claims.user_id, issued_at = claims.iat, "Authenticated request");
        Ok(AuthUser { user_id: claims.user_id })
    }
}
