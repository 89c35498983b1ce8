//! Grading result types and the immutable quiz attempt record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{GradingMode, Submission, PASS_THRESHOLD_PERCENT};

/// How a single question's score was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    /// Scored normally.
    Graded,
    /// No answer was given.
    Unanswered,
    /// Open-ended answer under a mode that does not grade free text.
    Ungraded,
    /// The free-text grader failed or timed out.
    GraderFailed,
}

/// Who produced a question's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradedBy {
    Rule,
    Grader,
}

/// Score breakdown for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: String,
    pub score: u32,
    pub max_points: u32,
    /// Derived: `score == max_points` on a question that counts.
    pub is_correct: bool,
    /// Whether `max_points` is included in the attempt's maximum.
    pub counts_toward_max: bool,
    pub status: QuestionStatus,
    pub graded_by: GradedBy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strengths: Vec<String>,
}

impl QuestionResult {
    pub fn new(
        question_id: &str,
        score: u32,
        max_points: u32,
        counts_toward_max: bool,
        status: QuestionStatus,
        graded_by: GradedBy,
    ) -> Self {
        Self {
            question_id: question_id.to_string(),
            score,
            max_points,
            is_correct: counts_toward_max && max_points > 0 && score == max_points,
            counts_toward_max,
            status,
            graded_by,
            feedback: None,
            corrections: Vec::new(),
            strengths: Vec::new(),
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        let feedback = feedback.into();
        if !feedback.is_empty() {
            self.feedback = Some(feedback);
        }
        self
    }
}

/// The outcome of grading one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    pub quiz_id: String,
    pub total_score: u32,
    pub max_score: u32,
    pub percentage: u32,
    pub passed: bool,
    pub per_question: Vec<QuestionResult>,
    pub grading_mode_requested: GradingMode,
    pub grading_mode_used: GradingMode,
    /// The requested mode was unavailable or not permitted; Auto was used.
    pub downgraded: bool,
    /// At least one delegated question could not be graded.
    pub partial_failure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// `round(100 * total / max)` with halves rounded up. Zero when `max` is zero.
pub fn score_percentage(total: u32, max: u32) -> u32 {
    if max == 0 {
        return 0;
    }
    let total = u64::from(total);
    let max = u64::from(max);
    ((200 * total + max) / (2 * max)) as u32
}

pub fn is_passing(percentage: u32) -> bool {
    percentage >= PASS_THRESHOLD_PERCENT
}

/// One graded submission. Never mutated after creation; a retake is a new attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub user_id: String,
    pub quiz_id: String,
    pub answers: BTreeMap<String, String>,
    pub per_question: Vec<QuestionResult>,
    pub total_score: u32,
    pub max_score: u32,
    pub percentage: u32,
    pub passed: bool,
    pub grading_mode: GradingMode,
    pub submitted_at: DateTime<Utc>,
}

impl QuizAttempt {
    pub fn record(
        user_id: &str,
        submission: &Submission,
        result: &GradingResult,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            quiz_id: result.quiz_id.clone(),
            answers: submission.answers.clone(),
            per_question: result.per_question.clone(),
            total_score: result.total_score,
            max_score: result.max_score,
            percentage: result.percentage,
            passed: result.passed,
            grading_mode: result.grading_mode_used,
            submitted_at,
        }
    }

    pub fn is_perfect(&self) -> bool {
        self.max_score > 0 && self.total_score == self.max_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_to_nearest() {
        assert_eq!(score_percentage(30, 40), 75);
        assert_eq!(score_percentage(1, 3), 33);
        assert_eq!(score_percentage(2, 3), 67);
        assert_eq!(score_percentage(1, 8), 13);
        assert_eq!(score_percentage(0, 40), 0);
        assert_eq!(score_percentage(40, 40), 100);
        assert_eq!(score_percentage(0, 0), 0);
    }

    #[test]
    fn pass_threshold_is_inclusive() {
        assert!(is_passing(70));
        assert!(!is_passing(69));
    }

    #[test]
    fn correctness_is_derived_from_score() {
        let full = QuestionResult::new("q", 10, 10, true, QuestionStatus::Graded, GradedBy::Rule);
        let partial =
            QuestionResult::new("q", 7, 10, true, QuestionStatus::Graded, GradedBy::Grader);
        let skipped = QuestionResult::new(
            "q",
            0,
            10,
            false,
            QuestionStatus::Unanswered,
            GradedBy::Rule,
        );
        assert!(full.is_correct);
        assert!(!partial.is_correct);
        assert!(!skipped.is_correct);
    }
}
