// src/models/feedback.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'feedback' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: i64,
    pub from_profile_id: i64,
    pub to_profile_id: i64,
    /// 1 to 5.
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Feedback joined with the reviewer's public details.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub feedback: Feedback,
    pub from_name: String,
    pub from_avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackList {
    pub profile_id: i64,
    pub average_rating: f64,
    pub count: i64,
    pub items: Vec<FeedbackView>,
}

/// DTO for leaving feedback on a profile.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    #[serde(alias = "toProfileId")]
    pub target_profile_id: i64,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 1000, message = "Comment must be at most 1000 chars"))]
    pub comment: Option<String>,
}
