//! Learning engine orchestrator.
//!
//! Wires a submission through grading, progress, streaks and achievements,
//! then persists the learner record once. Dates and timestamps are always
//! supplied by the caller.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::access::{AccessDecision, AccessGate};
use crate::achievements::{AchievementEngine, AchievementUpdate, LearnerSnapshot, LearningEvent};
use crate::error::EngineError;
use crate::grading::GradingEngine;
use crate::model::{Course, Submission, User};
use crate::progress::{ProgressRecord, ProgressTracker};
use crate::results::{GradingResult, QuizAttempt};
use crate::store::{LearnerRecord, LearnerStore};
use crate::streak::{CalendarView, StreakCalculator, StreakRecord, StreakResult};

/// Everything produced by one quiz submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub attempt_id: Uuid,
    pub result: GradingResult,
    /// Present when the pass completed the quiz's chapter (or re-confirmed it).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak: Option<StreakResult>,
    #[serde(default)]
    pub achievements: Vec<AchievementUpdate>,
}

/// Outcome of an explicit chapter completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterOutcome {
    pub progress: ProgressRecord,
    pub newly_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak: Option<StreakResult>,
    #[serde(default)]
    pub achievements: Vec<AchievementUpdate>,
}

/// Outcome of a standalone check-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInOutcome {
    pub streak: StreakResult,
    #[serde(default)]
    pub achievements: Vec<AchievementUpdate>,
}

/// The learning progress and assessment engine for one course.
pub struct LearningEngine {
    course: Course,
    grading: GradingEngine,
    tracker: ProgressTracker,
    streaks: StreakCalculator,
    achievements: AchievementEngine,
    gate: AccessGate,
    store: Arc<dyn LearnerStore>,
}

impl LearningEngine {
    pub fn new(course: Course, grading: GradingEngine, store: Arc<dyn LearnerStore>) -> Self {
        Self {
            course,
            grading,
            tracker: ProgressTracker::new(),
            streaks: StreakCalculator::new(),
            achievements: AchievementEngine::default(),
            gate: AccessGate::new(),
            store,
        }
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    /// Grade a submission and apply its consequences.
    ///
    /// Every attempt is recorded. A passing attempt also completes the quiz's
    /// chapter, checks the learner in for `today` and re-evaluates achievements.
    pub async fn submit_quiz(
        &self,
        user: &User,
        submission: &Submission,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<SubmissionOutcome, EngineError> {
        let quiz = self
            .course
            .quiz(&submission.quiz_id)
            .ok_or_else(|| EngineError::QuizNotFound(submission.quiz_id.clone()))?;
        // A quiz outside the course chapters is refused before grading.
        if self.course.chapter(&quiz.chapter_id).is_none() {
            return Err(EngineError::ChapterNotFound(quiz.chapter_id.clone()));
        }

        let result = self.grading.grade(user, quiz, submission).await?;

        let mut record = self.load(&user.id)?;
        let attempt = QuizAttempt::record(&user.id, submission, &result, now);
        record.attempts.push(attempt.clone());

        let mut outcome = SubmissionOutcome {
            attempt_id: attempt.id,
            result,
            progress: None,
            streak: None,
            achievements: Vec::new(),
        };

        if attempt.passed {
            let mut events = Vec::new();
            let progress = record.progress_mut(&self.course);
            if let Some(changed) = self
                .tracker
                .on_quiz_passed(&self.course, progress, &attempt, now)?
            {
                if changed.newly_completed {
                    events.push(LearningEvent::ChapterCompleted {
                        chapter_id: changed.chapter_id,
                    });
                }
                outcome.progress = Some(progress.record(&self.course));
            }
            events.insert(0, LearningEvent::QuizPassed { attempt });

            let streak = self.streaks.check_in(&mut record.streak, today);
            events.push(LearningEvent::StreakUpdated {
                streak: streak.clone(),
            });
            outcome.streak = Some(streak);
            outcome.achievements = self.evaluate(&mut record, &events, now);
        }

        self.save(&record)?;
        Ok(outcome)
    }

    /// Mark a chapter complete outside of a quiz.
    pub fn complete_chapter(
        &self,
        user: &User,
        chapter_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ChapterOutcome, EngineError> {
        let mut record = self.load(&user.id)?;
        let progress = record.progress_mut(&self.course);
        let changed = self
            .tracker
            .mark_chapter_complete(&self.course, progress, chapter_id, now)?;
        let progress = progress.record(&self.course);

        if !changed.newly_completed {
            return Ok(ChapterOutcome {
                progress,
                newly_completed: false,
                streak: None,
                achievements: Vec::new(),
            });
        }

        let streak = self.streaks.check_in(&mut record.streak, today);
        let events = [
            LearningEvent::ChapterCompleted {
                chapter_id: changed.chapter_id,
            },
            LearningEvent::StreakUpdated {
                streak: streak.clone(),
            },
        ];
        let achievements = self.evaluate(&mut record, &events, now);
        self.save(&record)?;

        Ok(ChapterOutcome {
            progress,
            newly_completed: true,
            streak: Some(streak),
            achievements,
        })
    }

    /// Record activity for `today` without any progress change.
    pub fn check_in(
        &self,
        user: &User,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome, EngineError> {
        let mut record = self.load(&user.id)?;
        let streak = self.streaks.check_in(&mut record.streak, today);
        let events = [LearningEvent::StreakUpdated {
            streak: streak.clone(),
        }];
        let achievements = self.evaluate(&mut record, &events, now);
        self.save(&record)?;
        Ok(CheckInOutcome {
            streak,
            achievements,
        })
    }

    pub fn calendar(&self, user: &User, year: i32, month: u32) -> Result<CalendarView, EngineError> {
        let record = self.load(&user.id)?;
        self.streaks.calendar(&record.streak, year, month)
    }

    /// Streak as displayed on `today`; a lapsed streak shows as zero.
    pub fn streak(&self, user: &User, today: NaiveDate) -> Result<StreakRecord, EngineError> {
        let record = self.load(&user.id)?;
        let mut streak = record.streak.record();
        streak.current_streak = record.streak.effective_current(today);
        Ok(streak)
    }

    pub fn progress(&self, user: &User) -> Result<ProgressRecord, EngineError> {
        let mut record = self.load(&user.id)?;
        Ok(record.progress_mut(&self.course).record(&self.course))
    }

    /// Full catalog status for the user.
    pub fn achievements(&self, user: &User) -> Result<Vec<AchievementUpdate>, EngineError> {
        let record = self.load(&user.id)?;
        let snapshot = self.snapshot(&record);
        Ok(self.achievements.view(&record.achievements, &snapshot))
    }

    /// Attempt history, oldest first, optionally for one quiz.
    pub fn attempts(
        &self,
        user: &User,
        quiz_id: Option<&str>,
    ) -> Result<Vec<QuizAttempt>, EngineError> {
        let record = self.load(&user.id)?;
        Ok(record
            .attempts
            .into_iter()
            .filter(|a| quiz_id.map_or(true, |id| a.quiz_id == id))
            .collect())
    }

    /// Content gating for a chapter of this course.
    pub fn chapter_access(
        &self,
        user: &User,
        chapter_id: &str,
    ) -> Result<AccessDecision, EngineError> {
        let chapter = self
            .course
            .chapter(chapter_id)
            .ok_or_else(|| EngineError::ChapterNotFound(chapter_id.to_string()))?;
        Ok(self.gate.can_access_chapter(user, chapter))
    }

    fn evaluate(
        &self,
        record: &mut LearnerRecord,
        events: &[LearningEvent],
        now: DateTime<Utc>,
    ) -> Vec<AchievementUpdate> {
        let snapshot = self.snapshot(record);
        let mut updates = Vec::new();
        for event in events {
            updates.extend(
                self.achievements
                    .evaluate(&mut record.achievements, &snapshot, event, now),
            );
        }
        for update in updates.iter().filter(|u| u.newly_unlocked) {
            info!(user = %record.user_id, achievement = %update.achievement_id, "unlocked");
        }
        updates
    }

    fn snapshot(&self, record: &LearnerRecord) -> LearnerSnapshot {
        LearnerSnapshot::capture(
            &self.course,
            record.progress.get(&self.course.id),
            &record.streak,
            &record.attempts,
        )
    }

    fn load(&self, user_id: &str) -> Result<LearnerRecord, EngineError> {
        Ok(self
            .store
            .load(user_id)
            .map_err(EngineError::Storage)?
            .unwrap_or_else(|| LearnerRecord::new(user_id)))
    }

    fn save(&self, record: &LearnerRecord) -> Result<(), EngineError> {
        self.store.save(record).map_err(EngineError::Storage)
    }
}
