//! The `studyloop submit` command.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{Cell, Table};
use serde::Deserialize;

use studyloop_core::access::{AccessDecision, AccessGate, Feature};
use studyloop_core::engine::SubmissionOutcome;
use studyloop_core::model::{GradingMode, Submission, Tier, User};
use studyloop_core::results::QuestionStatus;

use super::{now, print_unlocks, today, yes_no, Settings};

/// On-disk submission. The grading mode is optional so the CLI flag and the
/// config default can fill it in.
#[derive(Debug, Deserialize)]
struct SubmissionFile {
    quiz_id: String,
    #[serde(default)]
    answers: BTreeMap<String, String>,
    #[serde(default)]
    grading_mode: Option<GradingMode>,
}

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    settings: &Settings,
    course_path: PathBuf,
    user_id: String,
    tier: Tier,
    submission_path: PathBuf,
    mode: Option<GradingMode>,
    date: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let (engine, config) = settings.engine(&course_path)?;

    let content = std::fs::read_to_string(&submission_path).with_context(|| {
        format!("failed to read submission: {}", submission_path.display())
    })?;
    let file: SubmissionFile = serde_json::from_str(&content).with_context(|| {
        format!("failed to parse submission: {}", submission_path.display())
    })?;

    let submission = Submission {
        quiz_id: file.quiz_id,
        answers: file.answers,
        grading_mode: file
            .grading_mode
            .or(mode)
            .unwrap_or(config.default_grading_mode),
    };
    let user = User::new(user_id, tier);

    let outcome = engine
        .submit_quiz(&user, &submission, today(date), now())
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&user, &outcome);
    }

    Ok(())
}

fn print_outcome(user: &User, outcome: &SubmissionOutcome) {
    let result = &outcome.result;

    let mut table = Table::new();
    table.set_header(vec!["Question", "Score", "Status", "Feedback"]);
    for q in &result.per_question {
        let score = if q.counts_toward_max {
            format!("{}/{}", q.score, q.max_points)
        } else {
            "-".to_string()
        };
        table.add_row(vec![
            Cell::new(&q.question_id),
            Cell::new(score),
            Cell::new(status_label(q.status)),
            Cell::new(q.feedback.as_deref().unwrap_or("")),
        ]);
    }
    println!("{table}");

    println!(
        "\nQuiz {}: {}/{} ({}%), passed: {}",
        result.quiz_id,
        result.total_score,
        result.max_score,
        result.percentage,
        yes_no(result.passed)
    );
    if result.downgraded {
        let mut note = format!(
            "Grading mode {} is not available, graded as {}.",
            result.grading_mode_requested, result.grading_mode_used
        );
        match AccessGate::new().can_use_feature(user, Feature::AiGrading) {
            AccessDecision::Denied(reason) => {
                note.push(' ');
                note.push_str(&reason.upgrade_prompt());
            }
            AccessDecision::Allowed => note.push_str(" No grader is configured."),
        }
        println!("{note}");
    }
    if let Some(summary) = &result.summary {
        println!("{summary}");
    }
    if let Some(progress) = &outcome.progress {
        println!("Course progress: {}%", progress.percentage);
    }
    if let Some(streak) = &outcome.streak {
        println!(
            "Streak: {} day(s), longest {}",
            streak.current_streak, streak.longest_streak
        );
    }
    print_unlocks(&outcome.achievements);
}

fn status_label(status: QuestionStatus) -> &'static str {
    match status {
        QuestionStatus::Graded => "graded",
        QuestionStatus::Unanswered => "unanswered",
        QuestionStatus::Ungraded => "not graded",
        QuestionStatus::GraderFailed => "grader failed",
    }
}
