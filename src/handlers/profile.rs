// src/handlers/profile.rs

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        pagination::Page,
        profile::{
            DirectoryPage, DirectoryParams, MyProfileResponse, PROFILE_COLUMNS, ProfileResponse,
            ProfileRow, UpsertProfileRequest, blank_to_none, escape_like, filter_value,
            normalize_skill_names,
        },
    },
    state::AppState,
    utils::{
        assets::{MAX_PHOTO_BYTES, is_image},
        jwt::{AuthUser, MaybeAuthUser},
    },
};

const DIRECTORY_DEFAULT_LIMIT: i64 = 12;
const DIRECTORY_MAX_LIMIT: i64 = 50;

/// Resolves the profile the caller acts as.
///
/// No profile yet is a 400 (the client should send them to the profile form);
/// a banned profile is a 403.
pub async fn caller_profile_id(pool: &PgPool, account_id: i64) -> Result<i64, AppError> {
    let row = sqlx::query_as::<_, (i64, bool)>(
        "SELECT id, is_banned FROM profiles WHERE account_id = $1",
    )
    .bind(account_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some((_, true)) => Err(AppError::Forbidden("This account has been banned".to_string())),
        Some((id, false)) => Ok(id),
        None => Err(AppError::BadRequest("Create your profile first".to_string())),
    }
}

async fn fetch_profile_by_account(
    pool: &PgPool,
    account_id: i64,
) -> Result<Option<ProfileRow>, AppError> {
    let sql = format!("SELECT {} FROM profiles p WHERE p.account_id = $1", PROFILE_COLUMNS);
    Ok(sqlx::query_as::<_, ProfileRow>(&sql)
        .bind(account_id)
        .fetch_optional(pool)
        .await?)
}

/// Get the caller's own profile, including private fields.
pub async fn get_my_profile(
    State(pool): State<PgPool>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = fetch_profile_by_account(&pool, user.account_id)
        .await?
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    let (email, is_verified) = sqlx::query_as::<_, (String, bool)>(
        "SELECT email, is_verified FROM accounts WHERE id = $1",
    )
    .bind(user.account_id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(MyProfileResponse {
        profile: profile.into(),
        email,
        is_verified,
    }))
}

/// Replaces the links of one join table with the given skill names,
/// creating missing skills on the way.
async fn replace_skill_links(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    profile_id: i64,
    names: &[String],
) -> Result<(), AppError> {
    sqlx::query(&format!("DELETE FROM {} WHERE profile_id = $1", table))
        .bind(profile_id)
        .execute(&mut **tx)
        .await?;

    if names.is_empty() {
        return Ok(());
    }

    // The dictionary is keyed on lower(name): an existing spelling is reused.
    sqlx::query(
        "INSERT INTO skills (name) SELECT * FROM UNNEST($1::TEXT[]) \
         ON CONFLICT ((lower(name))) DO NOTHING",
    )
    .bind(names)
    .execute(&mut **tx)
    .await?;

    sqlx::query(&format!(
        r#"
        INSERT INTO {} (profile_id, skill_id)
        SELECT $1, s.id FROM skills s
        WHERE lower(s.name) IN (SELECT lower(n) FROM UNNEST($2::TEXT[]) AS n)
        ON CONFLICT DO NOTHING
        "#,
        table
    ))
    .bind(profile_id)
    .bind(names)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Create or update the caller's profile and its skill lists.
///
/// Role and ban state are never touched here.
pub async fn upsert_profile(
    State(pool): State<PgPool>,
    user: AuthUser,
    Json(payload): Json<UpsertProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }
    let offered = normalize_skill_names(&payload.skills_offered, "skillsOffered")?;
    let wanted = normalize_skill_names(&payload.skills_wanted, "skillsWanted")?;

    let mut tx = pool.begin().await?;

    let profile_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO profiles (account_id, name, location, avatar_url, availability, is_public)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (account_id) DO UPDATE SET
            name = EXCLUDED.name,
            location = EXCLUDED.location,
            avatar_url = EXCLUDED.avatar_url,
            availability = EXCLUDED.availability,
            is_public = EXCLUDED.is_public,
            updated_at = NOW()
        RETURNING id
        "#,
    )
    .bind(user.account_id)
    .bind(&name)
    .bind(blank_to_none(payload.location))
    .bind(blank_to_none(payload.avatar_url))
    .bind(blank_to_none(payload.availability))
    .bind(payload.is_public.unwrap_or(true))
    .fetch_one(&mut *tx)
    .await?;

    replace_skill_links(&mut tx, "offered_skills", profile_id, &offered).await?;
    replace_skill_links(&mut tx, "wanted_skills", profile_id, &wanted).await?;

    tx.commit().await?;

    tracing::info!(
        profile_id,
        offered = offered.len(),
        wanted = wanted.len(),
        "profile saved"
    );

    let profile = fetch_profile_by_account(&pool, user.account_id)
        .await?
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(ProfileResponse::from(profile)))
}

/// Appends the directory WHERE clause shared by the count and page queries.
fn push_directory_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    params: &DirectoryParams,
    exclude_account: Option<i64>,
) {
    builder.push(" WHERE p.is_public = TRUE AND p.is_banned = FALSE");

    if let Some(account_id) = exclude_account {
        builder.push(" AND p.account_id <> ");
        builder.push_bind(account_id);
    }

    if let Some(search) = filter_value(&params.search) {
        builder.push(" AND p.name ILIKE ");
        builder.push_bind(format!("%{}%", escape_like(&search)));
    }

    if let Some(offered) = filter_value(&params.offered) {
        builder.push(
            " AND EXISTS (SELECT 1 FROM offered_skills o JOIN skills s ON s.id = o.skill_id \
             WHERE o.profile_id = p.id AND lower(s.name) = lower(",
        );
        builder.push_bind(offered);
        builder.push("))");
    }

    if let Some(wanted) = filter_value(&params.wanted) {
        builder.push(
            " AND EXISTS (SELECT 1 FROM wanted_skills w JOIN skills s ON s.id = w.skill_id \
             WHERE w.profile_id = p.id AND lower(s.name) = lower(",
        );
        builder.push_bind(wanted);
        builder.push("))");
    }
}

/// Public directory of profiles (`/profile/all` and `/users`).
///
/// Only public, non-banned profiles; the caller's own profile is left out.
pub async fn list_public_profiles(
    State(pool): State<PgPool>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Query(params): Query<DirectoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::new(params.page, params.limit, DIRECTORY_DEFAULT_LIMIT, DIRECTORY_MAX_LIMIT);

    let mut count_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM profiles p");
    push_directory_filters(&mut count_builder, &params, caller);
    let total: i64 = count_builder
        .build_query_scalar()
        .fetch_one(&pool)
        .await?;

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
    builder.push(PROFILE_COLUMNS);
    builder.push(" FROM profiles p");
    push_directory_filters(&mut builder, &params, caller);
    builder.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ");
    builder.push_bind(page.limit);
    builder.push(" OFFSET ");
    builder.push_bind(page.offset());

    let rows: Vec<ProfileRow> = builder.build_query_as().fetch_all(&pool).await?;

    Ok(Json(DirectoryPage {
        profiles: rows.into_iter().map(ProfileResponse::from).collect(),
        page: page.page,
        limit: page.limit,
        total,
        total_pages: page.total_pages(total),
    }))
}

/// A single public profile. Callers may always see their own.
pub async fn get_public_profile(
    State(pool): State<PgPool>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!("SELECT {} FROM profiles p WHERE p.id = $1", PROFILE_COLUMNS);
    let profile = sqlx::query_as::<_, ProfileRow>(&sql)
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .filter(|p| Some(p.account_id) == caller || (p.is_public && !p.is_banned))
        .ok_or(AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(ProfileResponse::from(profile)))
}

/// Proxies an uploaded profile photo to the asset host and returns its URL.
pub async fn upload_photo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if !matches!(field.name(), Some("file") | Some("photo")) {
            continue;
        }

        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_default();
        if !is_image(&content_type) {
            return Err(AppError::BadRequest("Only image uploads are accepted".to_string()));
        }
        let file_name = field.file_name().unwrap_or("photo").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        if data.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }
        if data.len() > MAX_PHOTO_BYTES {
            return Err(AppError::BadRequest("Photo must be at most 5 MiB".to_string()));
        }

        let url = state.assets.upload(&file_name, &content_type, data).await?;
        tracing::info!(%url, "photo uploaded");
        return Ok(Json(serde_json::json!({ "url": url })));
    }

    Err(AppError::BadRequest("A 'file' field is required".to_string()))
}
