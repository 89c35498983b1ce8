//! Quiz grading.
//!
//! Multiple-choice questions are scored by rule. Open-ended questions (and,
//! in LLM-only mode, every question) are delegated to a [`FreeTextGrader`]
//! under a timeout. A grader failure costs the affected question its points
//! and flags the attempt; it never fails the submission.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::access::{AccessDecision, AccessGate, Feature};
use crate::error::{EngineError, GraderError};
use crate::model::{GradingMode, Question, QuestionKind, Quiz, Submission, User};
use crate::results::{
    is_passing, score_percentage, GradedBy, GradingResult, QuestionResult, QuestionStatus,
};
use crate::traits::{FreeTextGrader, GradeRequest, GradeVerdict};

/// Configuration for the grading engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on a single free-text grading call.
    pub grader_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grader_timeout: Duration::from_secs(30),
        }
    }
}

/// Scores quiz submissions.
pub struct GradingEngine {
    grader: Option<Arc<dyn FreeTextGrader>>,
    gate: AccessGate,
    config: EngineConfig,
}

impl GradingEngine {
    pub fn new(grader: Option<Arc<dyn FreeTextGrader>>, config: EngineConfig) -> Self {
        Self {
            grader,
            gate: AccessGate::new(),
            config,
        }
    }

    /// An engine with no free-text grader; every richer mode degrades to Auto.
    pub fn rule_only() -> Self {
        Self::new(None, EngineConfig::default())
    }

    /// Grade a submission against its quiz.
    ///
    /// Validation happens before any question is scored, so a malformed
    /// submission never reaches the grader.
    pub async fn grade(
        &self,
        user: &User,
        quiz: &Quiz,
        submission: &Submission,
    ) -> Result<GradingResult, EngineError> {
        validate_submission(quiz, submission)?;

        let requested = submission.grading_mode;
        let (mode, downgraded) = self.resolve_mode(user, requested);

        let mut per_question = Vec::with_capacity(quiz.questions.len());
        for question in &quiz.questions {
            let answer = submission
                .answers
                .get(&question.id)
                .map(|a| a.trim())
                .filter(|a| !a.is_empty());

            let result = match answer {
                _ if mode == GradingMode::Auto && question.is_open_ended() => ungraded(question),
                Some(answer) => self.grade_question(question, answer, mode).await,
                None => unanswered(question),
            };
            per_question.push(result);
        }

        let total_score: u32 = per_question
            .iter()
            .filter(|r| r.counts_toward_max)
            .map(|r| r.score)
            .sum();
        let max_score: u32 = per_question
            .iter()
            .filter(|r| r.counts_toward_max)
            .map(|r| r.max_points)
            .sum();
        let percentage = score_percentage(total_score, max_score);
        let passed = is_passing(percentage);
        let partial_failure = per_question
            .iter()
            .any(|r| r.status == QuestionStatus::GraderFailed);

        info!(
            quiz = %quiz.id,
            user = %user.id,
            mode = %mode,
            total_score,
            max_score,
            percentage,
            passed,
            "quiz graded"
        );

        let summary = summarize(&per_question, total_score, max_score, percentage, passed);

        Ok(GradingResult {
            quiz_id: quiz.id.clone(),
            total_score,
            max_score,
            percentage,
            passed,
            per_question,
            grading_mode_requested: requested,
            grading_mode_used: mode,
            downgraded,
            partial_failure,
            summary: Some(summary),
        })
    }

    /// Pick the mode actually used. Richer modes fall back to Auto when the
    /// tier does not allow them or no grader is configured.
    fn resolve_mode(&self, user: &User, requested: GradingMode) -> (GradingMode, bool) {
        match requested {
            GradingMode::Auto => (GradingMode::Auto, false),
            GradingMode::Hybrid | GradingMode::LlmOnly => {
                if let AccessDecision::Denied(reason) =
                    self.gate.can_use_feature(user, Feature::AiGrading)
                {
                    warn!(
                        user = %user.id,
                        requested = %requested,
                        tier = %reason.current,
                        "grading mode not permitted for tier, falling back to auto"
                    );
                    return (GradingMode::Auto, true);
                }
                if self.grader.is_none() {
                    warn!(
                        requested = %requested,
                        "{}, falling back to auto",
                        GraderError::Unavailable("no grader configured".into())
                    );
                    return (GradingMode::Auto, true);
                }
                (requested, false)
            }
        }
    }

    async fn grade_question(
        &self,
        question: &Question,
        answer: &str,
        mode: GradingMode,
    ) -> QuestionResult {
        let max = question.max_points();
        match (&question.kind, mode) {
            (QuestionKind::MultipleChoice { correct_option, .. }, GradingMode::Auto)
            | (QuestionKind::MultipleChoice { correct_option, .. }, GradingMode::Hybrid) => {
                score_choice(question, correct_option, answer)
            }
            (QuestionKind::MultipleChoice { correct_option, .. }, GradingMode::LlmOnly) => {
                match self.delegate(question, answer).await {
                    Ok(verdict) => from_verdict(question, verdict),
                    Err(e) => {
                        warn!(
                            question = %question.id,
                            grader = self.grader_name(),
                            "grader failed, scoring by rule: {e}"
                        );
                        let mut result = score_choice(question, correct_option, answer);
                        result.status = QuestionStatus::GraderFailed;
                        result
                    }
                }
            }
            (QuestionKind::OpenEnded { .. }, GradingMode::Auto) => ungraded(question),
            (QuestionKind::OpenEnded { .. }, GradingMode::Hybrid)
            | (QuestionKind::OpenEnded { .. }, GradingMode::LlmOnly) => {
                match self.delegate(question, answer).await {
                    Ok(verdict) => from_verdict(question, verdict),
                    Err(e) => {
                        warn!(
                            question = %question.id,
                            grader = self.grader_name(),
                            "grader failed, scoring zero: {e}"
                        );
                        QuestionResult::new(
                            &question.id,
                            0,
                            max,
                            true,
                            QuestionStatus::GraderFailed,
                            GradedBy::Grader,
                        )
                        .with_feedback("This answer could not be graded right now.")
                    }
                }
            }
        }
    }

    fn grader_name(&self) -> &str {
        self.grader.as_deref().map_or("none", |g| g.name())
    }

    async fn delegate(&self, question: &Question, answer: &str) -> Result<GradeVerdict, GraderError> {
        let Some(grader) = &self.grader else {
            return Err(GraderError::Unavailable("no grader configured".into()));
        };

        let request = GradeRequest {
            question_id: question.id.clone(),
            question: question.prompt.clone(),
            rubric_context: rubric_context(question),
            answer: answer.to_string(),
            max_points: question.max_points(),
        };

        match tokio::time::timeout(self.config.grader_timeout, grader.grade(&request)).await {
            Ok(result) => result,
            Err(_) => Err(GraderError::Timeout(self.config.grader_timeout.as_secs())),
        }
    }
}

/// Reject answers that reference questions outside the quiz.
fn validate_submission(quiz: &Quiz, submission: &Submission) -> Result<(), EngineError> {
    if submission.quiz_id != quiz.id {
        return Err(EngineError::MalformedSubmission(format!(
            "submission targets quiz '{}' but was graded against '{}'",
            submission.quiz_id, quiz.id
        )));
    }
    if let Some(unknown) = submission
        .answers
        .keys()
        .find(|id| quiz.question(id).is_none())
    {
        return Err(EngineError::MalformedSubmission(format!(
            "answer references unknown question '{unknown}'"
        )));
    }
    Ok(())
}

/// Auto mode never scores free text, answered or not.
fn ungraded(question: &Question) -> QuestionResult {
    debug!(question = %question.id, "open-ended question left ungraded in auto mode");
    QuestionResult::new(
        &question.id,
        0,
        question.max_points(),
        false,
        QuestionStatus::Ungraded,
        GradedBy::Rule,
    )
    .with_feedback("Open-ended answers are graded only in hybrid or llm mode.")
}

/// A skipped required question still counts toward the maximum.
fn unanswered(question: &Question) -> QuestionResult {
    QuestionResult::new(
        &question.id,
        0,
        question.max_points(),
        question.required,
        QuestionStatus::Unanswered,
        GradedBy::Rule,
    )
}

fn score_choice(question: &Question, correct_option: &str, answer: &str) -> QuestionResult {
    let max = question.max_points();
    let score = if answer == correct_option.trim() { max } else { 0 };
    let result = QuestionResult::new(
        &question.id,
        score,
        max,
        true,
        QuestionStatus::Graded,
        GradedBy::Rule,
    );
    if score == max {
        result
    } else {
        result.with_feedback(question.explanation.clone())
    }
}

fn from_verdict(question: &Question, verdict: GradeVerdict) -> QuestionResult {
    let max = question.max_points();
    let score = clamp_score(verdict.score, max);
    let mut result = QuestionResult::new(
        &question.id,
        score,
        max,
        true,
        QuestionStatus::Graded,
        GradedBy::Grader,
    )
    .with_feedback(verdict.feedback);
    result.corrections = verdict.corrections;
    result.strengths = verdict.strengths;
    result
}

fn clamp_score(raw: f64, max: u32) -> u32 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    (raw.round() as u32).min(max)
}

/// Plain-text context handed to the grader alongside the question.
fn rubric_context(question: &Question) -> String {
    let mut context = String::new();
    match &question.kind {
        QuestionKind::MultipleChoice {
            options,
            correct_option,
        } => {
            context.push_str("Options:\n");
            for option in options {
                context.push_str(&format!("- {}: {}\n", option.id, option.text));
            }
            context.push_str(&format!("Correct option: {correct_option}\n"));
        }
        QuestionKind::OpenEnded { rubric } => {
            if let Some(rubric) = rubric {
                context.push_str(&format!("Rubric: {rubric}\n"));
            }
        }
    }
    if !question.explanation.is_empty() {
        context.push_str(&format!("Reference explanation: {}\n", question.explanation));
    }
    context
}

fn summarize(
    per_question: &[QuestionResult],
    total: u32,
    max: u32,
    percentage: u32,
    passed: bool,
) -> String {
    let counted = per_question.iter().filter(|r| r.counts_toward_max).count();
    let correct = per_question.iter().filter(|r| r.is_correct).count();
    let verdict = if passed { "passed" } else { "not passed yet" };
    let mut summary = format!(
        "Scored {total}/{max} ({percentage}%), {verdict}. {correct} of {counted} graded questions fully correct."
    );
    if per_question
        .iter()
        .any(|r| r.status == QuestionStatus::GraderFailed)
    {
        summary.push_str(" Some answers could not be graded.");
    }
    if per_question
        .iter()
        .any(|r| r.status == QuestionStatus::Ungraded)
    {
        summary.push_str(" Open-ended answers were not graded.");
    }
    summary
}
