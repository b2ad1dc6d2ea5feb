// src/handlers/quiz.rs
//
// The quiz attempt lifecycle: sampling a question set, persisting the
// in-progress attempt, grading submissions, and the read-only history,
// results and performance views built on completed attempts.

use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder, prelude::FromRow};

use crate::{
    config::{
        DEFAULT_HISTORY_PAGE_SIZE, DEFAULT_LEADERBOARD_PAGE_SIZE, DEFAULT_QUESTION_COUNT,
        MAX_QUESTION_COUNT, MIN_QUESTION_COUNT,
    },
    error::AppError,
    grading::{self, AnswerKey},
    models::{
        question::{PublicQuestion, QuestionOptions},
        quiz::{
            AnswerReview, AttemptHeader, HistoryEntry, HistoryRow, Pagination, QuizAttempt,
            ResultRow, StartQuizRequest, SubmitQuizRequest,
        },
        skill::SkillSummary,
    },
    scoring::{self, CompletedAttempt},
    utils::jwt::Claims,
};

/// Sampled question row, fetched without the answer key columns.
#[derive(FromRow)]
struct SampledQuestion {
    id: i64,
    question_text: String,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: String,
}

/// Answer key row for grading a submission batch.
#[derive(FromRow)]
struct KeyRow {
    id: i64,
    correct_answer: String,
    skill_id: i64,
}

/// Starts a quiz attempt for a skill.
///
/// Samples a uniformly random subset of the skill's question bank (answer
/// keys stripped) and persists a new in-progress attempt. The attempt is
/// created before the user answers anything, so abandoned quizzes stay
/// visible as permanently in-progress rows.
pub async fn start_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let question_count = payload.question_count.unwrap_or(DEFAULT_QUESTION_COUNT);
    if !(MIN_QUESTION_COUNT..=MAX_QUESTION_COUNT).contains(&question_count) {
        return Err(AppError::BadRequest(format!(
            "Question count must be between {} and {}",
            MIN_QUESTION_COUNT, MAX_QUESTION_COUNT
        )));
    }

    let skill = sqlx::query_as::<_, SkillSummary>("SELECT id, name FROM skills WHERE id = $1")
        .bind(payload.skill_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Skill not found".to_string()))?;

    let available: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE skill_id = $1")
        .bind(skill.id)
        .fetch_one(&pool)
        .await?;

    if available < question_count {
        return Err(AppError::InsufficientBank { available });
    }

    // Uniform random sample drawn in the database; never "first N by id".
    let sampled = sqlx::query_as::<_, SampledQuestion>(
        r#"
        SELECT id, question_text, option_a, option_b, option_c, option_d
        FROM questions
        WHERE skill_id = $1
        ORDER BY RANDOM()
        LIMIT $2
        "#,
    )
    .bind(skill.id)
    .bind(question_count)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to sample questions for skill {}: {:?}", skill.id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    let total_questions = sampled.len() as i64;

    let attempt_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quiz_attempts (user_id, skill_id, total_questions)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(claims.user_id())
    .bind(skill.id)
    .bind(total_questions)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz attempt: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let questions: Vec<PublicQuestion> = sampled
        .into_iter()
        .map(|q| PublicQuestion {
            id: q.id,
            question_text: q.question_text,
            options: QuestionOptions {
                a: q.option_a,
                b: q.option_b,
                c: q.option_c,
                d: q.option_d,
            },
        })
        .collect();

    tracing::info!(
        "Quiz attempt {} started: user {} skill {} ({} questions)",
        attempt_id,
        claims.user_id(),
        skill.id,
        total_questions
    );

    Ok(Json(json!({
        "success": true,
        "message": "Quiz started successfully",
        "data": {
            "attemptId": attempt_id,
            "skill": skill,
            "questions": questions,
            "totalQuestions": total_questions,
        },
    })))
}

/// Submits an attempt's answers, grades them and finalizes the attempt.
///
/// The not-yet-completed check is re-asserted by the finalize UPDATE itself
/// (completed_at IS NULL), so a concurrent double submission loses with a
/// 409 instead of overwriting the first result.
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.answers.is_empty() {
        return Err(AppError::EmptyBatch);
    }

    let attempt = sqlx::query_as::<_, AttemptHeader>(
        "SELECT id, user_id, skill_id, completed_at FROM quiz_attempts WHERE id = $1",
    )
    .bind(payload.attempt_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz attempt not found".to_string()))?;

    if attempt.user_id != claims.user_id() {
        return Err(AppError::Forbidden(
            "Unauthorized access to this quiz attempt".to_string(),
        ));
    }

    if attempt.completed_at.is_some() {
        return Err(AppError::Conflict(
            "Quiz has already been submitted".to_string(),
        ));
    }

    // One set-based lookup for the whole batch instead of a query per answer.
    let mut question_ids: Vec<i64> = payload.answers.iter().map(|a| a.question_id).collect();
    question_ids.sort_unstable();
    question_ids.dedup();

    let mut query_builder = QueryBuilder::<Postgres>::new(
        "SELECT id, correct_answer, skill_id FROM questions WHERE id IN (",
    );
    let mut separated = query_builder.separated(",");
    for id in &question_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let key_rows: Vec<KeyRow> = query_builder
        .build_query_as()
        .fetch_all(&pool)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let keys: HashMap<i64, AnswerKey> = key_rows
        .into_iter()
        .map(|k| {
            (
                k.id,
                AnswerKey {
                    correct_answer: k.correct_answer,
                    skill_id: k.skill_id,
                },
            )
        })
        .collect();

    let graded = grading::grade_batch(attempt.skill_id, &payload.answers, &keys);
    if graded.is_empty() {
        return Err(AppError::NoValidAnswers);
    }

    let retained = graded.len() as i64;
    let correct = graded.iter().filter(|g| g.is_correct).count() as i64;
    let score = scoring::attempt_score(correct, retained);

    // Answer rows and the finalize write commit together; the loser of a
    // double-submit race rolls back and leaves nothing behind.
    let mut tx = pool.begin().await?;

    let mut insert = QueryBuilder::<Postgres>::new(
        "INSERT INTO quiz_answers (attempt_id, question_id, selected_answer, is_correct) ",
    );
    insert.push_values(graded.iter(), |mut b, answer| {
        b.push_bind(attempt.id)
            .push_bind(answer.question_id)
            .push_bind(answer.selected_answer.clone())
            .push_bind(answer.is_correct);
    });
    insert.build().execute(&mut *tx).await.map_err(|e| {
        tracing::error!("Failed to save answers for attempt {}: {:?}", attempt.id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    let finalized = sqlx::query(
        r#"
        UPDATE quiz_attempts
        SET correct_answers = $1, score = $2, completed_at = NOW()
        WHERE id = $3 AND completed_at IS NULL
        "#,
    )
    .bind(correct)
    .bind(score)
    .bind(attempt.id)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to finalize attempt {}: {:?}", attempt.id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    if finalized.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(AppError::Conflict(
            "Quiz has already been submitted".to_string(),
        ));
    }

    tx.commit().await?;

    let skill = sqlx::query_as::<_, SkillSummary>("SELECT id, name FROM skills WHERE id = $1")
        .bind(attempt.skill_id)
        .fetch_one(&pool)
        .await?;

    tracing::info!(
        "Quiz attempt {} submitted: {}/{} correct, score {:.1}",
        attempt.id,
        correct,
        retained,
        score
    );

    Ok(Json(json!({
        "success": true,
        "message": "Quiz submitted successfully",
        "data": {
            "attemptId": attempt.id,
            "skill": skill,
            "totalQuestions": retained,
            "correctAnswers": correct,
            "incorrectAnswers": retained - correct,
            "score": score,
            "percentage": scoring::format_percentage(score),
            "passed": scoring::is_passing(score),
        },
    })))
}

/// Query parameters for paginated list views.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Lists the caller's completed attempts, newest first.
/// In-progress attempts are excluded.
pub async fn get_history(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_PAGE_SIZE)
        .clamp(1, 100);
    let offset = (page - 1) * limit;

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM quiz_attempts WHERE user_id = $1 AND completed_at IS NOT NULL",
    )
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await?;

    let rows = sqlx::query_as::<_, HistoryRow>(
        r#"
        SELECT a.id, a.skill_id, s.name AS skill_name,
               a.total_questions, a.correct_answers, a.score,
               a.started_at, a.completed_at
        FROM quiz_attempts a
        JOIN skills s ON s.id = a.skill_id
        WHERE a.user_id = $1 AND a.completed_at IS NOT NULL
        ORDER BY a.completed_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(claims.user_id())
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    let attempts: Vec<HistoryEntry> = rows
        .into_iter()
        .map(|row| HistoryEntry {
            id: row.id,
            skill: SkillSummary {
                id: row.skill_id,
                name: row.skill_name,
            },
            total_questions: row.total_questions,
            correct_answers: row.correct_answers,
            score: row.score,
            percentage: scoring::format_percentage(row.score),
            passed: scoring::is_passing(row.score),
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "data": {
            "attempts": attempts,
            "pagination": Pagination::new(page, limit, total),
        },
    })))
}

/// Full per-question breakdown for one of the caller's attempts.
pub async fn get_results(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = sqlx::query_as::<_, QuizAttempt>(
        r#"
        SELECT id, user_id, skill_id, total_questions, correct_answers,
               score, started_at, completed_at
        FROM quiz_attempts
        WHERE id = $1
        "#,
    )
    .bind(attempt_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Quiz attempt not found".to_string()))?;

    if attempt.user_id != claims.user_id() {
        return Err(AppError::Forbidden(
            "Unauthorized access to this quiz attempt".to_string(),
        ));
    }

    let skill = sqlx::query_as::<_, SkillSummary>("SELECT id, name FROM skills WHERE id = $1")
        .bind(attempt.skill_id)
        .fetch_one(&pool)
        .await?;

    let rows = sqlx::query_as::<_, ResultRow>(
        r#"
        SELECT qa.question_id, q.question_text,
               q.option_a, q.option_b, q.option_c, q.option_d,
               q.correct_answer, q.difficulty,
               qa.selected_answer, qa.is_correct
        FROM quiz_answers qa
        JOIN questions q ON q.id = qa.question_id
        WHERE qa.attempt_id = $1
        ORDER BY qa.id
        "#,
    )
    .bind(attempt.id)
    .fetch_all(&pool)
    .await?;

    let questions: Vec<AnswerReview> = rows
        .into_iter()
        .map(|row| AnswerReview {
            question_id: row.question_id,
            question_text: row.question_text,
            difficulty: row.difficulty,
            options: QuestionOptions {
                a: row.option_a,
                b: row.option_b,
                c: row.option_c,
                d: row.option_d,
            },
            correct_answer: row.correct_answer,
            selected_answer: row.selected_answer,
            is_correct: row.is_correct,
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "data": {
            "attemptId": attempt.id,
            "skill": skill,
            "totalQuestions": attempt.total_questions,
            "correctAnswers": attempt.correct_answers,
            "score": attempt.score,
            "percentage": scoring::format_percentage(attempt.score),
            "passed": scoring::is_passing(attempt.score),
            "startedAt": attempt.started_at,
            "completedAt": attempt.completed_at,
            "questions": questions,
        },
    })))
}

/// Query parameters for the performance report.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceParams {
    /// "week", "month", or omitted for all time.
    pub time_period: Option<String>,
}

/// Completed attempt row consumed by the aggregator.
#[derive(FromRow)]
struct PerformanceRow {
    skill_id: i64,
    skill_name: String,
    score: f64,
}

/// Per-skill performance report with trend, gap and recommendation analysis.
pub async fn get_performance(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PerformanceParams>,
) -> Result<impl IntoResponse, AppError> {
    let cutoff = match params.time_period.as_deref() {
        Some("week") => Some(Utc::now() - Duration::days(7)),
        Some("month") => Some(Utc::now() - Duration::days(30)),
        _ => None,
    };

    // Chronological order matters: the aggregator compares first vs last
    // attempt per skill to derive the trend.
    let rows = sqlx::query_as::<_, PerformanceRow>(
        r#"
        SELECT a.skill_id, s.name AS skill_name, a.score
        FROM quiz_attempts a
        JOIN skills s ON s.id = a.skill_id
        WHERE a.user_id = $1
          AND a.completed_at IS NOT NULL
          AND ($2::TIMESTAMPTZ IS NULL OR a.completed_at >= $2)
        ORDER BY a.completed_at ASC
        "#,
    )
    .bind(claims.user_id())
    .bind(cutoff)
    .fetch_all(&pool)
    .await?;

    let attempts: Vec<CompletedAttempt> = rows
        .into_iter()
        .map(|row| CompletedAttempt {
            skill_id: row.skill_id,
            skill_name: row.skill_name,
            score: row.score,
        })
        .collect();

    let performance = scoring::summarize_by_skill(&attempts);
    let gaps = scoring::skill_gaps(&performance);
    let overall = scoring::overall_stats(&attempts, &performance, gaps.len());
    let recommendations = scoring::recommendation(&gaps);

    Ok(Json(json!({
        "success": true,
        "data": {
            "timePeriod": params.time_period.as_deref().unwrap_or("all"),
            "overallStats": overall,
            "performanceBySkill": performance,
            "skillGaps": gaps,
            "recommendations": recommendations,
        },
    })))
}

/// Non-admin user row for the leaderboard.
#[derive(FromRow)]
struct LeaderboardUser {
    id: i64,
    username: String,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Completed attempt rollup input per user.
#[derive(FromRow)]
struct UserAttemptRow {
    user_id: i64,
    skill_id: i64,
    score: f64,
}

/// Aggregate performance of every non-admin user, strongest first.
/// Admin only.
pub async fn get_all_users_performance(
    State(pool): State<PgPool>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_PAGE_SIZE)
        .clamp(1, 100);
    let offset = (page - 1) * limit;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'user'")
        .fetch_one(&pool)
        .await?;

    let users = sqlx::query_as::<_, LeaderboardUser>(
        r#"
        SELECT id, username, created_at
        FROM users
        WHERE role = 'user'
        ORDER BY id
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    let mut attempts_by_user: HashMap<i64, Vec<UserAttemptRow>> = HashMap::new();
    if !users.is_empty() {
        let mut query_builder = QueryBuilder::<Postgres>::new(
            "SELECT user_id, skill_id, score FROM quiz_attempts \
             WHERE completed_at IS NOT NULL AND user_id IN (",
        );
        let mut separated = query_builder.separated(",");
        for user in &users {
            separated.push_bind(user.id);
        }
        separated.push_unseparated(")");

        let rows: Vec<UserAttemptRow> = query_builder
            .build_query_as()
            .fetch_all(&pool)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        for row in rows {
            attempts_by_user.entry(row.user_id).or_default().push(row);
        }
    }

    let mut leaderboard: Vec<serde_json::Value> = users
        .into_iter()
        .map(|user| {
            let attempts = attempts_by_user.remove(&user.id).unwrap_or_default();
            let unique_skills = attempts
                .iter()
                .map(|a| a.skill_id)
                .collect::<HashSet<_>>()
                .len();
            let average_score = if attempts.is_empty() {
                0.0
            } else {
                scoring::round2(
                    attempts.iter().map(|a| a.score).sum::<f64>() / attempts.len() as f64,
                )
            };

            json!({
                "id": user.id,
                "username": user.username,
                "joinedAt": user.created_at,
                "stats": {
                    "totalAttempts": attempts.len(),
                    "uniqueSkills": unique_skills,
                    "averageScore": average_score,
                    "performance": scoring::performance_band(average_score),
                },
            })
        })
        .collect();

    leaderboard.sort_by(|a, b| {
        let score_a = a["stats"]["averageScore"].as_f64().unwrap_or(0.0);
        let score_b = b["stats"]["averageScore"].as_f64().unwrap_or(0.0);
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(Json(json!({
        "success": true,
        "data": {
            "users": leaderboard,
            "pagination": Pagination::new(page, limit, total),
        },
    })))
}
