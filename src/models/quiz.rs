// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::models::question::QuestionOptions;
use crate::models::skill::SkillSummary;

/// Represents the 'quiz_attempts' table in the database.
/// `completed_at` is NULL while the attempt is in progress and is set exactly
/// once when the attempt is submitted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub skill_id: i64,
    pub total_questions: i64,
    pub correct_answers: i64,
    /// Percentage 0-100, derived from correct/retained answers only.
    pub score: f64,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// The subset of attempt columns needed to validate a submission.
#[derive(Debug, FromRow)]
pub struct AttemptHeader {
    pub id: i64,
    pub user_id: i64,
    pub skill_id: i64,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for starting a quiz.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuizRequest {
    pub skill_id: i64,
    pub question_count: Option<i64>,
}

/// One submitted answer within a batch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub selected_answer: String,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizRequest {
    pub attempt_id: i64,
    pub answers: Vec<SubmittedAnswer>,
}

/// Completed attempt row joined with its skill, as listed in the history view.
#[derive(Debug, FromRow)]
pub struct HistoryRow {
    pub id: i64,
    pub skill_id: i64,
    pub skill_name: String,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub score: f64,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One entry of the quiz history response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: i64,
    pub skill: SkillSummary,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub score: f64,
    pub percentage: String,
    pub passed: bool,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Graded answer joined with its question, as returned by the results view.
#[derive(Debug, FromRow)]
pub struct ResultRow {
    pub question_id: i64,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: String,
    pub difficulty: String,
    pub selected_answer: String,
    pub is_correct: bool,
}

/// Per-question breakdown entry of the results view.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerReview {
    pub question_id: i64,
    pub question_text: String,
    pub difficulty: String,
    pub options: QuestionOptions,
    pub correct_answer: String,
    pub selected_answer: String,
    pub is_correct: bool,
}

/// Pagination envelope shared by the paginated list views.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total_items: i64) -> Self {
        let total_pages = if limit > 0 {
            (total_items + limit - 1) / limit
        } else {
            0
        };
        Self {
            current_page: page,
            total_pages,
            total_items,
            items_per_page: limit,
        }
    }
}
