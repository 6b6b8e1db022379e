//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs carrying the account id as `userId`. Logout is
//! client-side; nothing is revoked on the server.
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tokio::task::spawn_blocking;
use uuid::Uuid;

use crate::{config::Config, error::AppError, models::Account, state::AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(user_id: Uuid, config: &Config) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        user_id,
        iat: now.timestamp(),
        exp: (now + Duration::days(config.jwt_expire_days)).timestamp(),
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?)
}

pub fn decode_token(token: &str, config: &Config) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Token is not valid"))
}

/// Hashing runs on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    Ok(spawn_blocking(move || bcrypt::hash(password, cost)).await??)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    Ok(spawn_blocking(move || bcrypt::verify(password, &hash)).await??)
}

/// The caller's active account.
pub struct AuthUser(pub Account);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized("No token, authorization denied"))?;

        let claims = decode_token(token.trim(), &state.config)?;

        let account = state
            .database
            .account(&claims.user_id)
            .await?
            .ok_or(AppError::Unauthorized("Token is not valid"))?;

        if !account.user.is_active {
            return Err(AppError::Unauthorized("Account is deactivated"));
        }

        Ok(AuthUser(account))
    }
}

/// An authenticated teacher or admin.
pub struct Staff(pub Account);

impl FromRequestParts<Arc<AppState>> for Staff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(account) = AuthUser::from_request_parts(parts, state).await?;

        if !account.user.is_staff() {
            return Err(AppError::Forbidden);
        }

        Ok(Staff(account))
    }
}
