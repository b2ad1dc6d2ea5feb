// src/models/skill.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'skills' table in the database.
/// A skill is a named topic owning a bank of questions.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Skill {
    pub id: i64,

    /// Unique skill name (e.g., "Java", "React").
    pub name: String,

    pub description: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Skill row joined with counts of its questions and attempts.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SkillWithCounts {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub questions_count: i64,
    pub attempts_count: i64,
}

/// Minimal skill reference embedded in quiz responses.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SkillSummary {
    pub id: i64,
    pub name: String,
}

/// DTO for creating a new skill.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSkillRequest {
    #[validate(length(min = 1, max = 100, message = "Skill name is required"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// DTO for updating a skill. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateSkillRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}
