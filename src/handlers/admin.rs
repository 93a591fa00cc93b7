// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppError,
    models::{
        admin::{
            AdminLogView, AdminUserPage, AdminUserParams, AdminUserRow, LogParams,
            ModerateUserRequest, Moderation, PlatformReport, PlatformStats, ReportParams,
            SkillPopularity, StatsParams, StatusCounts, rating_distribution, window_start,
        },
        pagination::Page,
        profile::{RatingSummary, Role, escape_like, filter_value},
        swap_request::SwapStatus,
    },
    utils::jwt::AdminUser,
};

const USERS_DEFAULT_LIMIT: i64 = 20;
const USERS_MAX_LIMIT: i64 = 100;
const LOGS_DEFAULT_LIMIT: i64 = 50;
const LOGS_MAX_LIMIT: i64 = 200;
const TOP_SKILLS_DEFAULT: i64 = 5;
const TOP_SKILLS_MAX: i64 = 50;

const ADMIN_USER_COLUMNS: &str = r#"
    p.id AS profile_id, p.account_id, a.email, a.is_verified, p.name,
    p.role, p.is_public, p.is_banned, p.created_at
"#;

/// Swap request counts by status inside the window.
async fn request_counts(
    pool: &PgPool,
    since: Option<DateTime<Utc>>,
) -> Result<StatusCounts, AppError> {
    let rows = sqlx::query_as::<_, (SwapStatus, i64)>(
        r#"
        SELECT status, COUNT(*)
        FROM swap_requests
        WHERE $1::TIMESTAMPTZ IS NULL OR created_at >= $1
        GROUP BY status
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(StatusCounts::from_rows(&rows))
}

async fn rating_summary(
    pool: &PgPool,
    since: Option<DateTime<Utc>>,
) -> Result<RatingSummary, AppError> {
    let (sum, count) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COALESCE(SUM(rating), 0)::BIGINT, COUNT(*)
        FROM feedback
        WHERE $1::TIMESTAMPTZ IS NULL OR created_at >= $1
        "#,
    )
    .bind(since)
    .fetch_one(pool)
    .await?;

    Ok(RatingSummary { sum, count })
}

/// Platform-wide counters, optionally restricted to the last `days` days.
pub async fn get_stats(
    State(pool): State<PgPool>,
    _admin: AdminUser,
    Query(params): Query<StatsParams>,
) -> Result<impl IntoResponse, AppError> {
    let since = window_start(params.days, Utc::now())?;

    let (accounts, verified_accounts, profiles, public_profiles, banned_profiles, skills) =
        sqlx::query_as::<_, (i64, i64, i64, i64, i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM accounts
                    WHERE $1::TIMESTAMPTZ IS NULL OR created_at >= $1),
                (SELECT COUNT(*) FROM accounts
                    WHERE is_verified AND ($1::TIMESTAMPTZ IS NULL OR created_at >= $1)),
                (SELECT COUNT(*) FROM profiles
                    WHERE $1::TIMESTAMPTZ IS NULL OR created_at >= $1),
                (SELECT COUNT(*) FROM profiles
                    WHERE is_public AND ($1::TIMESTAMPTZ IS NULL OR created_at >= $1)),
                (SELECT COUNT(*) FROM profiles
                    WHERE is_banned AND ($1::TIMESTAMPTZ IS NULL OR created_at >= $1)),
                (SELECT COUNT(*) FROM skills)
            "#,
        )
        .bind(since)
        .fetch_one(&pool)
        .await?;

    let requests = request_counts(&pool, since).await?;
    let ratings = rating_summary(&pool, since).await?;

    Ok(Json(PlatformStats {
        window_days: params.days,
        accounts,
        verified_accounts,
        profiles,
        public_profiles,
        banned_profiles,
        skills,
        requests,
        feedback_count: ratings.count,
        average_rating: ratings.average(),
    }))
}

/// Skill popularity, rating distribution and request outcomes.
pub async fn get_reports(
    State(pool): State<PgPool>,
    _admin: AdminUser,
    Query(params): Query<ReportParams>,
) -> Result<impl IntoResponse, AppError> {
    let since = window_start(params.days, Utc::now())?;
    let top = params
        .top
        .unwrap_or(TOP_SKILLS_DEFAULT)
        .clamp(1, TOP_SKILLS_MAX);

    // Skill links carry no timestamp, so popularity ignores the window.
    let top_skills = sqlx::query_as::<_, SkillPopularity>(
        r#"
        SELECT id, name, offered_count, wanted_count, offered_count + wanted_count AS total
        FROM (
            SELECT s.id, s.name,
                (SELECT COUNT(*) FROM offered_skills o WHERE o.skill_id = s.id) AS offered_count,
                (SELECT COUNT(*) FROM wanted_skills w WHERE w.skill_id = s.id) AS wanted_count
            FROM skills s
        ) counts
        WHERE offered_count + wanted_count > 0
        ORDER BY total DESC, name ASC
        LIMIT $1
        "#,
    )
    .bind(top)
    .fetch_all(&pool)
    .await?;

    let buckets = sqlx::query_as::<_, (i32, i64)>(
        r#"
        SELECT rating, COUNT(*)
        FROM feedback
        WHERE $1::TIMESTAMPTZ IS NULL OR created_at >= $1
        GROUP BY rating
        "#,
    )
    .bind(since)
    .fetch_all(&pool)
    .await?;

    let ratings = rating_summary(&pool, since).await?;
    let requests = request_counts(&pool, since).await?;

    Ok(Json(PlatformReport {
        window_days: params.days,
        top_skills,
        rating_distribution: rating_distribution(&buckets),
        feedback_count: ratings.count,
        average_rating: ratings.average(),
        requests,
    }))
}

fn push_user_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    params: &AdminUserParams,
    role: Option<Role>,
) {
    builder.push(" WHERE TRUE");

    if let Some(search) = filter_value(&params.search) {
        let pattern = format!("%{}%", escape_like(&search));
        builder.push(" AND (p.name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR a.email ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    if let Some(role) = role {
        builder.push(" AND p.role = ");
        builder.push_bind(role);
    }

    if let Some(banned) = params.banned {
        builder.push(" AND p.is_banned = ");
        builder.push_bind(banned);
    }
}

/// Every profile, private and banned ones included.
pub async fn list_users(
    State(pool): State<PgPool>,
    _admin: AdminUser,
    Query(params): Query<AdminUserParams>,
) -> Result<impl IntoResponse, AppError> {
    let role = params.role_filter()?;
    let page = Page::new(params.page, params.limit, USERS_DEFAULT_LIMIT, USERS_MAX_LIMIT);

    let mut count_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT COUNT(*) FROM profiles p JOIN accounts a ON a.id = p.account_id",
    );
    push_user_filters(&mut count_builder, &params, role);
    let total: i64 = count_builder.build_query_scalar().fetch_one(&pool).await?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
    builder.push(ADMIN_USER_COLUMNS);
    builder.push(" FROM profiles p JOIN accounts a ON a.id = p.account_id");
    push_user_filters(&mut builder, &params, role);
    builder.push(" ORDER BY p.id DESC LIMIT ");
    builder.push_bind(page.limit);
    builder.push(" OFFSET ");
    builder.push_bind(page.offset());

    let users: Vec<AdminUserRow> = builder.build_query_as().fetch_all(&pool).await?;

    Ok(Json(AdminUserPage {
        users,
        page: page.page,
        limit: page.limit,
        total,
        total_pages: page.total_pages(total),
    }))
}

/// Ban, unban, promote or demote a profile.
///
/// The change and its audit row commit together.
pub async fn moderate_user(
    State(pool): State<PgPool>,
    admin: AdminUser,
    Json(payload): Json<ModerateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let action: Moderation = payload.action.parse()?;

    if payload.profile_id == admin.profile_id {
        return Err(AppError::BadRequest(
            "Administrators cannot moderate themselves".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let (role, is_banned) = sqlx::query_as::<_, (Role, bool)>(
        "SELECT role, is_banned FROM profiles WHERE id = $1 FOR UPDATE",
    )
    .bind(payload.profile_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    let (new_role, new_banned) = action.apply(role, is_banned);

    sqlx::query("UPDATE profiles SET role = $1, is_banned = $2, updated_at = NOW() WHERE id = $3")
        .bind(new_role)
        .bind(new_banned)
        .bind(payload.profile_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO admin_action_logs (admin_id, action, target_profile_id, details)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(admin.profile_id)
    .bind(action.log_action())
    .bind(payload.profile_id)
    .bind(format!(
        "role {:?} -> {:?}, banned {} -> {}",
        role, new_role, is_banned, new_banned
    ))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        admin_id = admin.profile_id,
        target_profile_id = payload.profile_id,
        ?action,
        "moderation applied"
    );

    let sql = format!(
        "SELECT {} FROM profiles p JOIN accounts a ON a.id = p.account_id WHERE p.id = $1",
        ADMIN_USER_COLUMNS
    );
    let user = sqlx::query_as::<_, AdminUserRow>(&sql)
        .bind(payload.profile_id)
        .fetch_one(&pool)
        .await?;

    Ok(Json(user))
}

/// Most recent audit-trail entries.
pub async fn list_logs(
    State(pool): State<PgPool>,
    _admin: AdminUser,
    Query(params): Query<LogParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = Page::new(None, params.limit, LOGS_DEFAULT_LIMIT, LOGS_MAX_LIMIT).limit;

    let logs = sqlx::query_as::<_, AdminLogView>(
        r#"
        SELECT l.id, l.admin_id, a.name AS admin_name, l.action,
               l.target_profile_id, t.name AS target_name, l.details, l.created_at
        FROM admin_action_logs l
        JOIN profiles a ON a.id = l.admin_id
        LEFT JOIN profiles t ON t.id = l.target_profile_id
        ORDER BY l.created_at DESC, l.id DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(logs))
}
