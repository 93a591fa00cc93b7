// src/handlers/auth.rs

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::account::{
        Account, ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
        ResetPasswordRequest, ResetPasswordToken, VerifyQuery, normalize_email,
    },
    state::AppState,
    utils::{
        hash::{check_password_strength, hash_password, verify_password},
        jwt::{TokenKind, sign_jwt, verify_jwt},
        mailer::{reset_mail, send_in_background, verification_mail},
    },
};

/// Registers a new account.
///
/// Hashes the password using Argon2 before storing it and mails a
/// verification link. Returns 201 Created and the account (without hash).
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.email = normalize_email(&payload.email);
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let account = sqlx::query_as::<_, Account>(
        r#"
        INSERT INTO accounts (email, password_hash)
        VALUES ($1, $2)
        RETURNING id, email, password_hash, is_verified, created_at
        "#,
    )
    .bind(&payload.email)
    .bind(&hashed_password)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => {
            AppError::Conflict(format!("Email '{}' is already registered", payload.email))
        }
        other => {
            tracing::error!("Failed to register account: {:?}", other);
            other
        }
    })?;

    let token = sign_jwt(
        account.id,
        TokenKind::Verify,
        &state.config.jwt_secret,
        state.config.verify_token_expiration,
    )?;
    let (subject, body) = verification_mail(&state.config.app_base_url, &token);
    send_in_background(state.mailer.clone(), account.email.clone(), subject, body);

    tracing::info!(account_id = account.id, "account registered");

    Ok((StatusCode::CREATED, Json(account)))
}

/// Authenticates an account and returns a JWT access token.
///
/// Unknown e-mail and wrong password share one message. Banned profiles
/// cannot log in.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email);

    let account = sqlx::query_as::<_, Account>(
        r#"
        SELECT id, email, password_hash, is_verified, created_at
        FROM accounts
        WHERE email = $1
        "#,
    )
    .bind(&email)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::AuthError("Invalid email or password".to_string()))?;

    if !verify_password(&payload.password, &account.password_hash)? {
        tracing::warn!(account_id = account.id, "login with wrong password");
        return Err(AppError::AuthError("Invalid email or password".to_string()));
    }

    let profile = sqlx::query_as::<_, (i64, bool)>(
        "SELECT id, is_banned FROM profiles WHERE account_id = $1",
    )
    .bind(account.id)
    .fetch_optional(&state.pool)
    .await?;

    if matches!(profile, Some((_, true))) {
        return Err(AppError::Forbidden("This account has been banned".to_string()));
    }

    let token = sign_jwt(
        account.id,
        TokenKind::Access,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        is_verified: account.is_verified,
        has_profile: profile.is_some(),
    }))
}

/// Consumes an e-mail verification token. Verifying twice is harmless.
pub async fn verify_email(
    State(pool): State<PgPool>,
    State(config): State<crate::config::Config>,
    Query(query): Query<VerifyQuery>,
) -> Result<impl IntoResponse, AppError> {
    let claims = verify_jwt(&query.token, &config.jwt_secret, TokenKind::Verify)
        .map_err(|_| AppError::BadRequest("Invalid or expired verification link".to_string()))?;
    let account_id = claims
        .account_id()
        .map_err(|_| AppError::BadRequest("Invalid or expired verification link".to_string()))?;

    let result = sqlx::query("UPDATE accounts SET is_verified = TRUE WHERE id = $1")
        .bind(account_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Account not found".to_string()));
    }

    tracing::info!(account_id, "email verified");

    Ok(Json(json!({ "message": "Email verified", "isVerified": true })))
}

/// Issues a password reset token and mails it.
///
/// The answer is the same whether or not the address is registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email);

    let account_id = sqlx::query_scalar::<_, i64>("SELECT id FROM accounts WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?;

    if let Some(account_id) = account_id {
        let token = uuid::Uuid::new_v4().to_string();
        let ttl = state.config.reset_token_ttl_minutes;
        let expires_at = Utc::now() + Duration::minutes(ttl);

        let mut tx = state.pool.begin().await?;

        sqlx::query("DELETE FROM reset_password_tokens WHERE account_id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO reset_password_tokens (account_id, token, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(account_id)
        .bind(&token)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let (subject, body) = reset_mail(&state.config.app_base_url, &token, ttl);
        send_in_background(state.mailer.clone(), email, subject, body);
        tracing::info!(account_id, "password reset requested");
    } else {
        tracing::debug!("password reset requested for unknown email");
    }

    Ok(Json(json!({
        "message": "If the email is registered, a reset link has been sent."
    })))
}

/// Sets a new password using a reset token. The token works once.
pub async fn reset_password(
    State(pool): State<PgPool>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_password_strength(&payload.new_password)?;

    let mut tx = pool.begin().await?;

    let token = sqlx::query_as::<_, ResetPasswordToken>(
        r#"
        SELECT id, account_id, token, expires_at
        FROM reset_password_tokens
        WHERE token = $1
        FOR UPDATE
        "#,
    )
    .bind(payload.token.trim())
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".to_string()))?;

    sqlx::query("DELETE FROM reset_password_tokens WHERE id = $1")
        .bind(token.id)
        .execute(&mut *tx)
        .await?;

    if token.is_expired(Utc::now()) {
        // Keep the deletion of the stale token.
        tx.commit().await?;
        return Err(AppError::BadRequest("Invalid or expired reset token".to_string()));
    }

    let hashed = hash_password(&payload.new_password)?;
    sqlx::query("UPDATE accounts SET password_hash = $1 WHERE id = $2")
        .bind(&hashed)
        .bind(token.account_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(account_id = token.account_id, "password reset");

    Ok(Json(json!({ "message": "Password updated" })))
}
