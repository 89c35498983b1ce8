//! Collaborator trait for free-text grading.
//!
//! Implemented by the graders in `studyloop-graders`. The engine bounds every
//! call with its own timeout, so implementations may block on the network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GraderError;

/// A service that scores a free-text (or delegated multiple-choice) answer.
#[async_trait]
pub trait FreeTextGrader: Send + Sync {
    /// Human-readable grader name (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Score one answer against its question and rubric.
    async fn grade(&self, request: &GradeRequest) -> Result<GradeVerdict, GraderError>;
}

/// What the grader receives for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRequest {
    pub question_id: String,
    /// The question text shown to the learner.
    pub question: String,
    /// Rubric, options and reference answer, rendered as plain text.
    pub rubric_context: String,
    /// The learner's answer.
    pub answer: String,
    /// Highest score the grader may award.
    pub max_points: u32,
}

/// What the grader returns for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeVerdict {
    /// Awarded points in `0..=max_points`; out-of-range values are clamped.
    pub score: f64,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub corrections: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
}
