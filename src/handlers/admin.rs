// src/handlers/admin.rs
//
// Content administration: skill and question bank CRUD. Admin only.
// These surfaces are simple pass-through persistence; the quiz engine
// consumes them read-only.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{CreateQuestionRequest, Question, UpdateQuestionRequest},
    models::quiz::Pagination,
    models::skill::{CreateSkillRequest, UpdateSkillRequest},
};

/// Creates a new skill.
/// Skill names are unique case-insensitively.
pub async fn create_skill(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateSkillRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Skill name is required".to_string()));
    }

    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM skills WHERE LOWER(name) = LOWER($1)")
            .bind(&name)
            .fetch_optional(&pool)
            .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(
            "A skill with this name already exists".to_string(),
        ));
    }

    let description = payload
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO skills (name, description)
        VALUES ($1, $2)
        RETURNING id
        "#,
    )
    .bind(&name)
    .bind(&description)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create skill: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Skill created successfully",
            "data": { "id": id, "name": name },
        })),
    ))
}

/// Updates a skill by ID. Fields are optional.
pub async fn update_skill(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSkillRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.name.is_none() && payload.description.is_none() {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE skills SET ");
    let mut separated = builder.separated(", ");

    if let Some(name) = payload.name {
        separated.push("name = ");
        separated.push_bind_unseparated(name);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(description);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update skill: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Skill not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a skill by ID.
/// Cascades to its questions, attempts and answers. Irreversible.
pub async fn delete_skill(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM skills WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete skill: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Skill not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for listing questions.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuestionsParams {
    pub skill_id: Option<i64>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Lists questions, optionally filtered by skill, newest first.
/// Includes the answer keys, hence admin only.
pub async fn list_questions(
    State(pool): State<PgPool>,
    Query(params): Query<ListQuestionsParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * limit;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM questions WHERE ($1::BIGINT IS NULL OR skill_id = $1)",
    )
    .bind(params.skill_id)
    .fetch_one(&pool)
    .await?;

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, skill_id, question_text,
               option_a, option_b, option_c, option_d,
               correct_answer, difficulty, created_at
        FROM questions
        WHERE ($1::BIGINT IS NULL OR skill_id = $1)
        ORDER BY id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(params.skill_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "questions": questions,
            "pagination": Pagination::new(page, limit, total),
        },
    })))
}

/// Creates a new question for a skill.
pub async fn create_question(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let skill_exists: Option<i64> = sqlx::query_scalar("SELECT id FROM skills WHERE id = $1")
        .bind(payload.skill_id)
        .fetch_optional(&pool)
        .await?;

    if skill_exists.is_none() {
        return Err(AppError::NotFound("Skill not found".to_string()));
    }

    let difficulty = payload.difficulty.unwrap_or_else(|| "MEDIUM".to_string());

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO questions
        (skill_id, question_text, option_a, option_b, option_c, option_d, correct_answer, difficulty)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(payload.skill_id)
    .bind(&payload.question_text)
    .bind(&payload.option_a)
    .bind(&payload.option_b)
    .bind(&payload.option_c)
    .bind(&payload.option_d)
    .bind(&payload.correct_answer)
    .bind(&difficulty)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Question created successfully",
            "data": { "id": id },
        })),
    ))
}

/// Updates a question by ID. Fields are optional.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.question_text.is_none()
        && payload.option_a.is_none()
        && payload.option_b.is_none()
        && payload.option_c.is_none()
        && payload.option_d.is_none()
        && payload.correct_answer.is_none()
        && payload.difficulty.is_none()
    {
        return Ok(StatusCode::OK);
    }

    if let Some(ref label) = payload.correct_answer {
        if !matches!(label.as_str(), "A" | "B" | "C" | "D") {
            return Err(AppError::BadRequest(
                "Correct answer must be one of A, B, C, D".to_string(),
            ));
        }
    }

    if let Some(ref difficulty) = payload.difficulty {
        if !matches!(difficulty.as_str(), "EASY" | "MEDIUM" | "HARD") {
            return Err(AppError::BadRequest(
                "Difficulty must be one of EASY, MEDIUM, HARD".to_string(),
            ));
        }
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    if let Some(question_text) = payload.question_text {
        separated.push("question_text = ");
        separated.push_bind_unseparated(question_text);
    }

    if let Some(option_a) = payload.option_a {
        separated.push("option_a = ");
        separated.push_bind_unseparated(option_a);
    }

    if let Some(option_b) = payload.option_b {
        separated.push("option_b = ");
        separated.push_bind_unseparated(option_b);
    }

    if let Some(option_c) = payload.option_c {
        separated.push("option_c = ");
        separated.push_bind_unseparated(option_c);
    }

    if let Some(option_d) = payload.option_d {
        separated.push("option_d = ");
        separated.push_bind_unseparated(option_d);
    }

    if let Some(correct_answer) = payload.correct_answer {
        separated.push("correct_answer = ");
        separated.push_bind_unseparated(correct_answer);
    }

    if let Some(difficulty) = payload.difficulty {
        separated.push("difficulty = ");
        separated.push_bind_unseparated(difficulty);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a quiz question by ID.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
