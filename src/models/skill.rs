// src/models/skill.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A 'skills' row with how many profiles offer and want it.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillWithUsage {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub offered_count: i64,
    pub wanted_count: i64,
}

/// Expects the table alias `s`.
pub const SKILL_USAGE_COLUMNS: &str = r#"
    s.id, s.name, s.category,
    (SELECT COUNT(*) FROM offered_skills o WHERE o.skill_id = s.id) AS offered_count,
    (SELECT COUNT(*) FROM wanted_skills w WHERE w.skill_id = s.id) AS wanted_count
"#;

/// Query parameters for listing skills.
#[derive(Debug, Default, Deserialize)]
pub struct SkillListParams {
    /// Case-insensitive name substring.
    pub search: Option<String>,
    /// Exact category.
    pub category: Option<String>,
}
