// src/scoring.rs
//
// Score and performance aggregation over completed attempts. Pure functions:
// handlers fetch the rows and feed them in chronological order.

use serde::Serialize;

use crate::config::PASSING_SCORE_PERCENTAGE;
use crate::models::skill::SkillSummary;

/// Per-attempt score: percentage of correct answers among the retained ones.
/// Callers must guarantee `retained > 0` (an all-discarded batch is an error,
/// never a 0% score).
pub fn attempt_score(correct: i64, retained: i64) -> f64 {
    (correct as f64 / retained as f64) * 100.0
}

/// Renders a score with one decimal place, e.g. "62.5%".
pub fn format_percentage(score: f64) -> String {
    format!("{:.1}%", score)
}

pub fn is_passing(score: f64) -> bool {
    score >= PASSING_SCORE_PERCENTAGE
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One completed attempt as consumed by the aggregator.
/// Slices handed to `summarize_by_skill` must be in chronological order.
#[derive(Debug, Clone)]
pub struct CompletedAttempt {
    pub skill_id: i64,
    pub skill_name: String,
    pub score: f64,
}

/// Score direction across a skill's attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    InsufficientData,
}

/// Aggregated statistics for one skill.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillPerformance {
    pub skill: SkillSummary,
    pub attempts_count: i64,
    pub average_score: f64,
    pub best_score: f64,
    pub worst_score: f64,
    pub trend: Trend,
}

impl SkillPerformance {
    /// A skill is a gap when its average score is strictly below the
    /// passing threshold.
    pub fn is_gap(&self) -> bool {
        self.average_score < PASSING_SCORE_PERCENTAGE
    }
}

/// Overall rollup across all included attempts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total_attempts: i64,
    pub average_score: f64,
    pub skills_attempted: i64,
    pub skills_needing_improvement: i64,
}

struct SkillAccumulator {
    skill_id: i64,
    skill_name: String,
    count: i64,
    total: f64,
    first: f64,
    last: f64,
    best: f64,
    worst: f64,
}

/// Groups chronologically ordered attempts by skill and computes per-skill
/// statistics. The result is sorted ascending by average score so the
/// weakest skills surface first.
pub fn summarize_by_skill(attempts: &[CompletedAttempt]) -> Vec<SkillPerformance> {
    let mut order: Vec<i64> = Vec::new();
    let mut stats: std::collections::HashMap<i64, SkillAccumulator> =
        std::collections::HashMap::new();

    for attempt in attempts {
        let acc = stats.entry(attempt.skill_id).or_insert_with(|| {
            order.push(attempt.skill_id);
            SkillAccumulator {
                skill_id: attempt.skill_id,
                skill_name: attempt.skill_name.clone(),
                count: 0,
                total: 0.0,
                first: attempt.score,
                last: attempt.score,
                best: attempt.score,
                worst: attempt.score,
            }
        });

        acc.count += 1;
        acc.total += attempt.score;
        acc.last = attempt.score;
        acc.best = acc.best.max(attempt.score);
        acc.worst = acc.worst.min(attempt.score);
    }

    let mut performance: Vec<SkillPerformance> = order
        .into_iter()
        .filter_map(|skill_id| stats.remove(&skill_id))
        .map(|acc| {
            // A tie between first and last attempt counts as declining.
            let trend = if acc.count < 2 {
                Trend::InsufficientData
            } else if acc.last > acc.first {
                Trend::Improving
            } else {
                Trend::Declining
            };

            SkillPerformance {
                skill: SkillSummary {
                    id: acc.skill_id,
                    name: acc.skill_name,
                },
                attempts_count: acc.count,
                average_score: round2(acc.total / acc.count as f64),
                best_score: round2(acc.best),
                worst_score: round2(acc.worst),
                trend,
            }
        })
        .collect();

    performance.sort_by(|a, b| {
        a.average_score
            .partial_cmp(&b.average_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    performance
}

/// Filters the per-skill summary down to the gap skills.
pub fn skill_gaps(performance: &[SkillPerformance]) -> Vec<SkillPerformance> {
    performance.iter().filter(|p| p.is_gap()).cloned().collect()
}

pub fn overall_stats(
    attempts: &[CompletedAttempt],
    performance: &[SkillPerformance],
    gap_count: usize,
) -> OverallStats {
    let average_score = if attempts.is_empty() {
        0.0
    } else {
        round2(attempts.iter().map(|a| a.score).sum::<f64>() / attempts.len() as f64)
    };

    OverallStats {
        total_attempts: attempts.len() as i64,
        average_score,
        skills_attempted: performance.len() as i64,
        skills_needing_improvement: gap_count as i64,
    }
}

/// Human-readable advice naming the gap skills, or encouragement if none.
pub fn recommendation(gaps: &[SkillPerformance]) -> String {
    if gaps.is_empty() {
        "Great job! Keep practicing to maintain your skills.".to_string()
    } else {
        let names: Vec<&str> = gaps.iter().map(|g| g.skill.name.as_str()).collect();
        format!("Focus on improving: {}", names.join(", "))
    }
}

/// Qualitative band for the cross-user leaderboard.
pub fn performance_band(average_score: f64) -> &'static str {
    if average_score >= 80.0 {
        "excellent"
    } else if average_score >= 70.0 {
        "good"
    } else if average_score >= 60.0 {
        "average"
    } else {
        "needs_improvement"
    }
}
