// src/models/profile.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

use crate::error::AppError;

/// Longest accepted skill name, in characters.
pub const MAX_SKILL_NAME: usize = 60;

/// Profile role, stored as the Postgres enum `profile_role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "profile_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

/// Columns selected for every enriched profile read. Expects the table alias `p`.
///
/// Skill names come back sorted; `rating_sum`/`rating_count` feed [`RatingSummary`].
pub const PROFILE_COLUMNS: &str = r#"
    p.id, p.account_id, p.name, p.location, p.avatar_url, p.availability,
    p.is_public, p.role, p.is_banned, p.created_at, p.updated_at,
    ARRAY(
        SELECT s.name FROM offered_skills o JOIN skills s ON s.id = o.skill_id
        WHERE o.profile_id = p.id ORDER BY s.name
    ) AS skills_offered,
    ARRAY(
        SELECT s.name FROM wanted_skills w JOIN skills s ON s.id = w.skill_id
        WHERE w.profile_id = p.id ORDER BY s.name
    ) AS skills_wanted,
    COALESCE((SELECT SUM(f.rating) FROM feedback f WHERE f.to_profile_id = p.id), 0)::BIGINT AS rating_sum,
    (SELECT COUNT(*) FROM feedback f WHERE f.to_profile_id = p.id) AS rating_count
"#;

/// A 'profiles' row enriched with its skills and rating aggregate.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub availability: Option<String>,
    pub is_public: bool,
    pub role: Role,
    pub is_banned: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub skills_offered: Vec<String>,
    pub skills_wanted: Vec<String>,
    pub rating_sum: i64,
    pub rating_count: i64,
}

/// Sum and count of the ratings a profile received.
#[derive(Debug, Clone, Copy, Default)]
pub struct RatingSummary {
    pub sum: i64,
    pub count: i64,
}

impl RatingSummary {
    pub fn from_ratings(ratings: &[i32]) -> Self {
        Self {
            sum: ratings.iter().map(|r| i64::from(*r)).sum(),
            count: ratings.len() as i64,
        }
    }

    /// Mean rating, 0 when nobody has rated yet.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }
}

/// Public view of a profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub availability: Option<String>,
    pub is_public: bool,
    pub role: Role,
    pub skills_offered: Vec<String>,
    pub skills_wanted: Vec<String>,
    pub average_rating: f64,
    pub feedback_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ProfileRow> for ProfileResponse {
    fn from(row: ProfileRow) -> Self {
        let rating = RatingSummary {
            sum: row.rating_sum,
            count: row.rating_count,
        };
        Self {
            id: row.id,
            name: row.name,
            location: row.location,
            avatar_url: row.avatar_url,
            availability: row.availability,
            is_public: row.is_public,
            role: row.role,
            skills_offered: row.skills_offered,
            skills_wanted: row.skills_wanted,
            average_rating: rating.average(),
            feedback_count: rating.count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// The caller's own profile, with account details.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyProfileResponse {
    #[serde(flatten)]
    pub profile: ProfileResponse,
    pub email: String,
    pub is_verified: bool,
}

/// DTO for creating or updating the caller's profile.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpsertProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name length must be between 1 and 100 chars"))]
    pub name: String,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub avatar_url: Option<String>,
    #[validate(length(max = 500))]
    pub availability: Option<String>,
    pub is_public: Option<bool>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub skills_offered: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub skills_wanted: Vec<String>,
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    // Blank means "no avatar" and is cleared later.
    if !url.trim().is_empty() && Url::parse(url.trim()).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}

/// Empty optional strings are stored as NULL.
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trims skill names, drops blanks and removes case-insensitive duplicates.
/// The first spelling of a name wins. Names over [`MAX_SKILL_NAME`] are
/// rejected.
pub fn normalize_skill_names(names: &[String], field: &str) -> Result<Vec<String>, AppError> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        if name.chars().count() > MAX_SKILL_NAME {
            return Err(AppError::BadRequest(format!(
                "{}: skill names must be at most {} characters",
                field, MAX_SKILL_NAME
            )));
        }
        if seen.insert(name.to_lowercase()) {
            out.push(name.to_string());
        }
    }
    Ok(out)
}

/// Query parameters for the public directory.
#[derive(Debug, Default, Deserialize)]
pub struct DirectoryParams {
    /// Case-insensitive name substring.
    pub search: Option<String>,
    /// Exact offered skill name.
    pub offered: Option<String>,
    /// Exact wanted skill name.
    pub wanted: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryPage {
    pub profiles: Vec<ProfileResponse>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// Escapes `%`, `_` and `\` so user input matches literally inside LIKE.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Turns an optional query value into a trimmed, non-empty filter.
pub fn filter_value(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
