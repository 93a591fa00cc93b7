// src/models/admin.rs

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    error::AppError,
    models::{profile::Role, swap_request::SwapStatus},
};

/// Audit-trail action tag, stored as the Postgres enum `admin_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "admin_action", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminAction {
    BanUser,
    UnbanUser,
    PromoteUser,
    DemoteUser,
    PostAnnouncement,
}

/// A moderation command sent to `PATCH /admin/users`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Moderation {
    Ban,
    Unban,
    Promote,
    Demote,
}

impl FromStr for Moderation {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BAN" => Ok(Moderation::Ban),
            "UNBAN" => Ok(Moderation::Unban),
            "PROMOTE" => Ok(Moderation::Promote),
            "DEMOTE" => Ok(Moderation::Demote),
            other => Err(AppError::BadRequest(format!(
                "Invalid action '{}', expected BAN, UNBAN, PROMOTE or DEMOTE",
                other
            ))),
        }
    }
}

impl Moderation {
    pub fn log_action(self) -> AdminAction {
        match self {
            Moderation::Ban => AdminAction::BanUser,
            Moderation::Unban => AdminAction::UnbanUser,
            Moderation::Promote => AdminAction::PromoteUser,
            Moderation::Demote => AdminAction::DemoteUser,
        }
    }

    /// Returns the `(role, is_banned)` pair after the action.
    pub fn apply(self, role: Role, is_banned: bool) -> (Role, bool) {
        match self {
            Moderation::Ban => (role, true),
            Moderation::Unban => (role, false),
            Moderation::Promote => (Role::Admin, is_banned),
            Moderation::Demote => (Role::User, is_banned),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerateUserRequest {
    pub profile_id: i64,
    pub action: String,
}

/// A profile as the moderation screen sees it.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserRow {
    pub profile_id: i64,
    pub account_id: i64,
    pub email: String,
    pub is_verified: bool,
    pub name: String,
    pub role: Role,
    pub is_public: bool,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminUserParams {
    pub search: Option<String>,
    pub role: Option<String>,
    pub banned: Option<bool>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl AdminUserParams {
    pub fn role_filter(&self) -> Result<Option<Role>, AppError> {
        match self.role.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(r) if r.eq_ignore_ascii_case("USER") => Ok(Some(Role::User)),
            Some(r) if r.eq_ignore_ascii_case("ADMIN") => Ok(Some(Role::Admin)),
            Some(r) => Err(AppError::BadRequest(format!("Invalid role '{}'", r))),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserPage {
    pub users: Vec<AdminUserRow>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// An 'admin_action_logs' row with the names of both sides.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogView {
    pub id: i64,
    pub admin_id: i64,
    pub admin_name: String,
    pub action: AdminAction,
    pub target_profile_id: Option<i64>,
    pub target_name: Option<String>,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
    /// Trailing window in days; absent means all time.
    pub days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    pub days: Option<i64>,
    /// How many skills to rank (default 5).
    pub top: Option<i64>,
}

pub const MAX_WINDOW_DAYS: i64 = 3650;

/// Start of the trailing window, or `None` for all time.
pub fn window_start(
    days: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, AppError> {
    match days {
        None => Ok(None),
        Some(d) if (1..=MAX_WINDOW_DAYS).contains(&d) => Ok(Some(now - Duration::days(d))),
        Some(d) => Err(AppError::BadRequest(format!(
            "days must be between 1 and {}, got {}",
            MAX_WINDOW_DAYS, d
        ))),
    }
}

#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub accepted: i64,
    pub rejected: i64,
    pub cancelled: i64,
}

impl StatusCounts {
    pub fn from_rows(rows: &[(SwapStatus, i64)]) -> Self {
        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            counts.total += n;
            match status {
                SwapStatus::Pending => counts.pending += n,
                SwapStatus::Accepted => counts.accepted += n,
                SwapStatus::Rejected => counts.rejected += n,
                SwapStatus::Cancelled => counts.cancelled += n,
            }
        }
        counts
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub window_days: Option<i64>,
    pub accounts: i64,
    pub verified_accounts: i64,
    pub profiles: i64,
    pub public_profiles: i64,
    pub banned_profiles: i64,
    pub skills: i64,
    pub requests: StatusCounts,
    pub feedback_count: i64,
    pub average_rating: f64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillPopularity {
    pub id: i64,
    pub name: String,
    pub offered_count: i64,
    pub wanted_count: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RatingBucket {
    pub rating: i32,
    pub count: i64,
}

/// One bucket per rating 1..=5; ratings nobody gave are reported as 0.
pub fn rating_distribution(rows: &[(i32, i64)]) -> Vec<RatingBucket> {
    (1..=5)
        .map(|rating| RatingBucket {
            rating,
            count: rows
                .iter()
                .filter(|(r, _)| *r == rating)
                .map(|(_, n)| *n)
                .sum(),
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformReport {
    pub window_days: Option<i64>,
    pub top_skills: Vec<SkillPopularity>,
    pub rating_distribution: Vec<RatingBucket>,
    pub feedback_count: i64,
    pub average_rating: f64,
    pub requests: StatusCounts,
}
