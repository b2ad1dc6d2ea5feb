// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'questions' table in the database.
/// Carries the authoritative correct-answer label; exposed only on admin
/// surfaces and in post-submission result breakdowns.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,

    pub skill_id: i64,

    pub question_text: String,

    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,

    /// One of 'A', 'B', 'C', 'D'. Must match one of the four option labels.
    pub correct_answer: String,

    /// 'EASY', 'MEDIUM' or 'HARD'.
    pub difficulty: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// The four option texts, keyed by their labels.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionOptions {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
    #[serde(rename = "C")]
    pub c: String,
    #[serde(rename = "D")]
    pub d: String,
}

/// DTO for sending a sampled question to the quiz taker.
/// Deliberately excludes the correct answer and difficulty.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub question_text: String,
    pub options: QuestionOptions,
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    pub skill_id: i64,
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    #[validate(length(min = 1, max = 500))]
    pub option_a: String,
    #[validate(length(min = 1, max = 500))]
    pub option_b: String,
    #[validate(length(min = 1, max = 500))]
    pub option_c: String,
    #[validate(length(min = 1, max = 500))]
    pub option_d: String,
    #[validate(custom(function = validate_answer_label))]
    pub correct_answer: String,
    #[validate(custom(function = validate_difficulty))]
    pub difficulty: Option<String>,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuestionRequest {
    pub question_text: Option<String>,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub correct_answer: Option<String>,
    pub difficulty: Option<String>,
}

fn validate_answer_label(label: &str) -> Result<(), validator::ValidationError> {
    match label {
        "A" | "B" | "C" | "D" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_answer_label")),
    }
}

fn validate_difficulty(difficulty: &str) -> Result<(), validator::ValidationError> {
    match difficulty {
        "EASY" | "MEDIUM" | "HARD" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_difficulty")),
    }
}
