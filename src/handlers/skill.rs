// src/handlers/skill.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppError,
    models::{
        profile::{escape_like, filter_value},
        skill::{SKILL_USAGE_COLUMNS, SkillListParams, SkillWithUsage},
    },
};

/// Lists the skill dictionary with usage counts, ordered by name.
pub async fn list_skills(
    State(pool): State<PgPool>,
    Query(params): Query<SkillListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
    builder.push(SKILL_USAGE_COLUMNS);
    builder.push(" FROM skills s WHERE TRUE");

    if let Some(search) = filter_value(&params.search) {
        builder.push(" AND s.name ILIKE ");
        builder.push_bind(format!("%{}%", escape_like(&search)));
    }

    if let Some(category) = filter_value(&params.category) {
        builder.push(" AND s.category = ");
        builder.push_bind(category);
    }

    builder.push(" ORDER BY s.name ASC");

    let skills: Vec<SkillWithUsage> = builder.build_query_as().fetch_all(&pool).await?;

    Ok(Json(skills))
}

/// Get a single skill by ID.
pub async fn get_skill(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!("SELECT {} FROM skills s WHERE s.id = $1", SKILL_USAGE_COLUMNS);
    let skill = sqlx::query_as::<_, SkillWithUsage>(&sql)
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Skill not found".to_string()))?;

    Ok(Json(skill))
}
