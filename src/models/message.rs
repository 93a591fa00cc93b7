// src/models/message.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A 'platform_messages' row joined with the author's name.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformMessage {
    pub id: i64,
    pub admin_id: i64,
    pub admin_name: String,
    pub title: String,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for posting an announcement.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMessageRequest {
    #[validate(length(min = 1, max = 200, message = "Title length must be between 1 and 200 chars"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "Body length must be between 1 and 5000 chars"))]
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageListParams {
    pub limit: Option<i64>,
}
