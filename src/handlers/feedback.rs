// src/handlers/feedback.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::profile::caller_profile_id,
    models::{
        feedback::{CreateFeedbackRequest, Feedback, FeedbackList, FeedbackView},
        profile::RatingSummary,
    },
    utils::{html::clean_html, jwt::AuthUser},
};

/// Leaves a rating (and optional comment) on another profile.
pub async fn create_feedback(
    State(pool): State<PgPool>,
    user: AuthUser,
    Json(payload): Json<CreateFeedbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let from_profile_id = caller_profile_id(&pool, user.account_id).await?;
    if from_profile_id == payload.target_profile_id {
        return Err(AppError::BadRequest("You cannot rate yourself".to_string()));
    }

    let target_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM profiles WHERE id = $1)")
            .bind(payload.target_profile_id)
            .fetch_one(&pool)
            .await?;
    if !target_exists {
        return Err(AppError::NotFound("Target profile not found".to_string()));
    }

    let comment = payload
        .comment
        .as_deref()
        .map(clean_html)
        .filter(|c| !c.is_empty());

    let feedback = sqlx::query_as::<_, Feedback>(
        r#"
        INSERT INTO feedback (from_profile_id, to_profile_id, rating, comment)
        VALUES ($1, $2, $3, $4)
        RETURNING id, from_profile_id, to_profile_id, rating, comment, created_at
        "#,
    )
    .bind(from_profile_id)
    .bind(payload.target_profile_id)
    .bind(payload.rating)
    .bind(comment)
    .fetch_one(&pool)
    .await?;

    tracing::info!(
        feedback_id = feedback.id,
        from_profile_id,
        to_profile_id = feedback.to_profile_id,
        rating = feedback.rating,
        "feedback created"
    );

    Ok((StatusCode::CREATED, Json(feedback)))
}

/// Feedback a profile received, newest first, with its rating summary.
pub async fn list_feedback(
    State(pool): State<PgPool>,
    Path(profile_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM profiles WHERE id = $1)")
            .bind(profile_id)
            .fetch_one(&pool)
            .await?;
    if !exists {
        return Err(AppError::NotFound("Profile not found".to_string()));
    }

    let items = sqlx::query_as::<_, FeedbackView>(
        r#"
        SELECT f.id, f.from_profile_id, f.to_profile_id, f.rating, f.comment, f.created_at,
               p.name AS from_name, p.avatar_url AS from_avatar_url
        FROM feedback f
        JOIN profiles p ON p.id = f.from_profile_id
        WHERE f.to_profile_id = $1
        ORDER BY f.created_at DESC, f.id DESC
        "#,
    )
    .bind(profile_id)
    .fetch_all(&pool)
    .await?;

    let ratings: Vec<i32> = items.iter().map(|f| f.feedback.rating).collect();
    let summary = RatingSummary::from_ratings(&ratings);

    Ok(Json(FeedbackList {
        profile_id,
        average_rating: summary.average(),
        count: summary.count,
        items,
    }))
}
