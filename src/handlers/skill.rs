// src/handlers/skill.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{error::AppError, models::skill::SkillWithCounts};

/// Lists all skills alphabetically, each with its question and attempt counts.
pub async fn list_skills(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let skills = sqlx::query_as::<_, SkillWithCounts>(
        r#"
        SELECT
            s.id, s.name, s.description, s.created_at,
            (SELECT COUNT(*) FROM questions q WHERE q.skill_id = s.id) AS questions_count,
            (SELECT COUNT(*) FROM quiz_attempts a WHERE a.skill_id = s.id) AS attempts_count
        FROM skills s
        ORDER BY s.name ASC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list skills: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let total = skills.len();
    Ok(Json(json!({
        "success": true,
        "data": { "skills": skills, "total": total },
    })))
}

/// Retrieves a single skill by ID.
pub async fn get_skill(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let skill = sqlx::query_as::<_, SkillWithCounts>(
        r#"
        SELECT
            s.id, s.name, s.description, s.created_at,
            (SELECT COUNT(*) FROM questions q WHERE q.skill_id = s.id) AS questions_count,
            (SELECT COUNT(*) FROM quiz_attempts a WHERE a.skill_id = s.id) AS attempts_count
        FROM skills s
        WHERE s.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Skill not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "data": { "skill": skill },
    })))
}
