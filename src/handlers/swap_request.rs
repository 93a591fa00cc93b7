// src/handlers/swap_request.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    handlers::profile::caller_profile_id,
    models::swap_request::{
        CreateSwapRequest, SwapListParams, SwapRequest, SwapRequestRow, SwapRequestView,
        SwapStatus, UpdateStatusRequest,
    },
    utils::{html::required_text, jwt::AuthUser},
};

const MAX_SKILL_LABEL: usize = 100;
const MAX_MESSAGE: usize = 2000;

/// Lists every request the caller sent or received, newest first.
///
/// Each entry carries `isIncoming` so the client can split the tabs.
pub async fn list_requests(
    State(pool): State<PgPool>,
    user: AuthUser,
    Query(params): Query<SwapListParams>,
) -> Result<impl IntoResponse, AppError> {
    let status = params.status_filter()?;
    let incoming = params.incoming_filter()?;
    let me = caller_profile_id(&pool, user.account_id).await?;

    let rows = sqlx::query_as::<_, SwapRequestRow>(
        r#"
        SELECT
            r.id, r.sender_id, r.receiver_id, r.offered_skill, r.requested_skill,
            r.message, r.status, r.created_at, r.updated_at,
            c.name AS counterpart_name,
            c.avatar_url AS counterpart_avatar_url
        FROM swap_requests r
        JOIN profiles c
          ON c.id = CASE WHEN r.receiver_id = $1 THEN r.sender_id ELSE r.receiver_id END
        WHERE (r.sender_id = $1 OR r.receiver_id = $1)
          AND ($2::swap_status IS NULL OR r.status = $2)
          AND ($3::BOOLEAN IS NULL OR (r.receiver_id = $1) = $3)
        ORDER BY r.created_at DESC, r.id DESC
        "#,
    )
    .bind(me)
    .bind(status)
    .bind(incoming)
    .fetch_all(&pool)
    .await?;

    let views: Vec<SwapRequestView> = rows
        .into_iter()
        .map(|row| SwapRequestView::for_profile(row, me))
        .collect();

    Ok(Json(views))
}

/// Sends a swap request from the caller's profile. The request starts PENDING.
pub async fn create_request(
    State(pool): State<PgPool>,
    user: AuthUser,
    Json(payload): Json<CreateSwapRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Labels and message share one rule: length as typed, stored sanitized.
    let offered_skill = required_text(&payload.offered_skill, "offeredSkill", MAX_SKILL_LABEL)?;
    let requested_skill =
        required_text(&payload.requested_skill, "requestedSkill", MAX_SKILL_LABEL)?;
    let message = required_text(&payload.message, "message", MAX_MESSAGE)?;

    let sender_id = caller_profile_id(&pool, user.account_id).await?;
    if sender_id == payload.receiver_id {
        return Err(AppError::BadRequest(
            "You cannot send a swap request to yourself".to_string(),
        ));
    }

    let receiver_banned =
        sqlx::query_scalar::<_, bool>("SELECT is_banned FROM profiles WHERE id = $1")
            .bind(payload.receiver_id)
            .fetch_optional(&pool)
            .await?;
    if !matches!(receiver_banned, Some(false)) {
        return Err(AppError::NotFound("Target profile not found".to_string()));
    }

    let request = sqlx::query_as::<_, SwapRequest>(
        r#"
        INSERT INTO swap_requests (sender_id, receiver_id, offered_skill, requested_skill, message)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, sender_id, receiver_id, offered_skill, requested_skill,
                  message, status, created_at, updated_at
        "#,
    )
    .bind(sender_id)
    .bind(payload.receiver_id)
    .bind(&offered_skill)
    .bind(&requested_skill)
    .bind(&message)
    .fetch_one(&pool)
    .await
    .map_err(|e| match AppError::from(e) {
        // One pending request per sender/receiver pair (partial unique index).
        AppError::Conflict(_) => AppError::Conflict(
            "You already have a pending request to this profile".to_string(),
        ),
        other => other,
    })?;

    tracing::info!(
        request_id = request.id,
        sender_id,
        receiver_id = request.receiver_id,
        "swap request created"
    );

    Ok((StatusCode::CREATED, Json(request)))
}

/// Moves a request out of PENDING.
///
/// Used by both `PATCH /request/{id}` and `PATCH /request/{id}/status`, so the
/// two paths share one rule set.
pub async fn update_request_status(
    State(pool): State<PgPool>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let target: SwapStatus = payload.status.parse()?;
    let me = caller_profile_id(&pool, user.account_id).await?;

    let request = sqlx::query_as::<_, SwapRequest>(
        r#"
        SELECT id, sender_id, receiver_id, offered_skill, requested_skill,
               message, status, created_at, updated_at
        FROM swap_requests
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Swap request not found".to_string()))?;

    let party = request
        .party_of(me)
        .ok_or(AppError::NotFound("Swap request not found".to_string()))?;

    let next = request.status.transition(target, party).map_err(|e| {
        tracing::warn!(request_id = id, profile_id = me, ?e, "swap transition refused");
        AppError::from(e)
    })?;

    // Conditional write: only one caller can move a request out of PENDING.
    let updated = sqlx::query_as::<_, SwapRequest>(
        r#"
        UPDATE swap_requests
        SET status = $1, updated_at = NOW()
        WHERE id = $2 AND status = 'PENDING'
        RETURNING id, sender_id, receiver_id, offered_skill, requested_skill,
                  message, status, created_at, updated_at
        "#,
    )
    .bind(next)
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::Conflict("Request is no longer pending".to_string()))?;

    tracing::info!(request_id = id, profile_id = me, status = %next, "swap request updated");

    Ok(Json(updated))
}
