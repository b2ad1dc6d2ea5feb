// src/grading.rs
//
// Batch grading of submitted answers. Pure logic: the handler fetches the
// authoritative answer keys in one query and hands them in as a map.

use std::collections::HashMap;

use crate::models::quiz::SubmittedAnswer;

/// Authoritative key for one question: its correct label and owning skill.
#[derive(Debug, Clone)]
pub struct AnswerKey {
    pub correct_answer: String,
    pub skill_id: i64,
}

/// A submitted answer that survived validation and was scored.
#[derive(Debug, Clone)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub selected_answer: String,
    pub is_correct: bool,
}

/// Normalizes a raw selected-answer value to an uppercase label.
/// Returns None for anything that is not exactly A, B, C or D after
/// uppercasing; whitespace-padded labels are discarded, not repaired.
pub fn normalize_label(raw: &str) -> Option<String> {
    let label = raw.to_uppercase();
    match label.as_str() {
        "A" | "B" | "C" | "D" => Some(label),
        _ => None,
    }
}

/// Grades a batch of submitted answers against the key map.
///
/// Pairs are silently discarded when the label is invalid, the question id
/// is unknown, or the question belongs to a different skill than the attempt.
/// Duplicate submissions for the same question are each graded and retained.
pub fn grade_batch(
    attempt_skill_id: i64,
    submitted: &[SubmittedAnswer],
    keys: &HashMap<i64, AnswerKey>,
) -> Vec<GradedAnswer> {
    submitted
        .iter()
        .filter_map(|answer| {
            let selected = normalize_label(&answer.selected_answer)?;

            let key = keys.get(&answer.question_id)?;
            if key.skill_id != attempt_skill_id {
                return None;
            }

            let is_correct = selected == key.correct_answer;
            Some(GradedAnswer {
                question_id: answer.question_id,
                selected_answer: selected,
                is_correct,
            })
        })
        .collect()
}
