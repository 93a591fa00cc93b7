// src/utils/jwt.rs

use std::{
    convert::Infallible,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::{config::Config, error::AppError, models::profile::Role};

/// Distinguishes API access tokens from e-mail verification tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Verify,
}

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the Account ID (as string).
    pub sub: String,
    pub kind: TokenKind,
    /// Issued-at as Unix timestamp.
    pub iat: usize,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn account_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token".to_string()))
    }
}

fn now_secs() -> Result<usize, AppError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize)
}

/// Signs a new JWT for the account.
///
/// Arguments:
/// * `account_id`: Account ID, stored in `sub`.
/// * `kind`: what the token may be used for.
/// * `expiration_seconds`: lifetime from now.
pub fn sign_jwt(
    account_id: i64,
    kind: TokenKind,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let now = now_secs()?;

    let claims = Claims {
        sub: account_id.to_string(),
        kind,
        iat: now,
        exp: now + expiration_seconds as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string, requiring the given token kind.
///
/// Returns the `Claims` if valid, otherwise `AppError::AuthError`.
pub fn verify_jwt(token: &str, secret: &str, expected: TokenKind) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    if token_data.claims.kind != expected {
        return Err(AppError::AuthError("Invalid token".to_string()));
    }

    Ok(token_data.claims)
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extractor: any caller holding a valid access token.
///
/// Rejects with 401 when the `Authorization: Bearer <token>` header is missing,
/// malformed, expired or signed with another key.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub account_id: i64,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Config: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Config::from_ref(state);
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))?;

        let claims = verify_jwt(token, &config.jwt_secret, TokenKind::Access)?;
        Ok(AuthUser {
            account_id: claims.account_id()?,
        })
    }
}

/// Extractor: the caller's account id when a valid token is present,
/// `None` otherwise. Never rejects; a bad token means anonymous.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<i64>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    Config: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Config::from_ref(state);
        let account_id = bearer_token(parts)
            .and_then(|token| verify_jwt(token, &config.jwt_secret, TokenKind::Access).ok())
            .and_then(|claims| claims.account_id().ok());
        Ok(MaybeAuthUser(account_id))
    }
}

/// Extractor: an authenticated caller whose profile has the ADMIN role.
///
/// The role is read from the database on every request, so a demotion takes
/// effect immediately. No profile, a USER role or a banned profile is 403.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
    pub account_id: i64,
    pub profile_id: i64,
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    Config: FromRef<S>,
    PgPool: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser { account_id } = AuthUser::from_request_parts(parts, state).await?;
        let pool = PgPool::from_ref(state);

        let row = sqlx::query_as::<_, (i64, Role, bool)>(
            "SELECT id, role, is_banned FROM profiles WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&pool)
        .await?;

        match row {
            Some((profile_id, Role::Admin, false)) => Ok(AdminUser {
                account_id,
                profile_id,
            }),
            _ => {
                tracing::warn!(account_id, "admin route refused");
                Err(AppError::Forbidden("Admin access required".to_string()))
            }
        }
    }
}
