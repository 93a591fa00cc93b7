// src/handlers/message.rs

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        admin::AdminAction,
        message::{CreateMessageRequest, MessageListParams, PlatformMessage},
        pagination::Page,
    },
    utils::{html::clean_html, jwt::AdminUser},
};

const FEED_DEFAULT_LIMIT: i64 = 20;
const FEED_MAX_LIMIT: i64 = 100;

const MESSAGE_SELECT: &str = r#"
    SELECT m.id, m.admin_id, p.name AS admin_name, m.title, m.body, m.created_at
    FROM platform_messages m
    JOIN profiles p ON p.id = m.admin_id
"#;

/// All announcements, for the admin console.
pub async fn list_messages(
    State(pool): State<PgPool>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!("{} ORDER BY m.created_at DESC, m.id DESC", MESSAGE_SELECT);
    let messages = sqlx::query_as::<_, PlatformMessage>(&sql)
        .fetch_all(&pool)
        .await?;

    Ok(Json(messages))
}

/// Posts an announcement and records it in the audit trail.
pub async fn create_message(
    State(pool): State<PgPool>,
    admin: AdminUser,
    Json(payload): Json<CreateMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = CreateMessageRequest {
        title: clean_html(&payload.title),
        body: clean_html(&payload.body),
    };
    payload.validate()?;

    let mut tx = pool.begin().await?;

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO platform_messages (admin_id, title, body) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(admin.profile_id)
    .bind(&payload.title)
    .bind(&payload.body)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO admin_action_logs (admin_id, action, details) VALUES ($1, $2, $3)",
    )
    .bind(admin.profile_id)
    .bind(AdminAction::PostAnnouncement)
    .bind(format!("message {}: {}", id, payload.title))
    .execute(&mut *tx)
    .await?;

    let sql = format!("{} WHERE m.id = $1", MESSAGE_SELECT);
    let message = sqlx::query_as::<_, PlatformMessage>(&sql)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(message_id = id, admin_id = admin.profile_id, "announcement posted");

    Ok((StatusCode::CREATED, Json(message)))
}

/// Public announcement feed.
pub async fn list_platform_messages(
    State(pool): State<PgPool>,
    Query(params): Query<MessageListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = Page::new(None, params.limit, FEED_DEFAULT_LIMIT, FEED_MAX_LIMIT).limit;

    let sql = format!("{} ORDER BY m.created_at DESC, m.id DESC LIMIT $1", MESSAGE_SELECT);
    let messages = sqlx::query_as::<_, PlatformMessage>(&sql)
        .bind(limit)
        .fetch_all(&pool)
        .await?;

    Ok(Json(messages))
}
