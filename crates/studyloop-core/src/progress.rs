//! Per-course chapter completion tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::model::Course;
use crate::results::QuizAttempt;

/// One user's progress through one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub user_id: String,
    pub course_id: String,
    /// Completed chapter ids in completion order, without duplicates.
    pub completed_chapters: Vec<String>,
    /// "Where am I" pointer. `None` once the last chapter is done.
    pub current_chapter_id: Option<String>,
    pub last_activity: Option<DateTime<Utc>>,
}

impl Progress {
    pub fn new(user_id: &str, course: &Course) -> Self {
        Self {
            user_id: user_id.to_string(),
            course_id: course.id.clone(),
            completed_chapters: Vec::new(),
            current_chapter_id: course.first_chapter().map(|c| c.id.clone()),
            last_activity: None,
        }
    }

    pub fn is_completed(&self, chapter_id: &str) -> bool {
        self.completed_chapters.iter().any(|c| c == chapter_id)
    }

    /// `completed / total * 100`, truncated.
    pub fn completion_percentage(&self, course: &Course) -> u32 {
        let total = course.total_chapters();
        if total == 0 {
            return 0;
        }
        (self.completed_chapters.len() * 100 / total) as u32
    }

    pub fn record(&self, course: &Course) -> ProgressRecord {
        ProgressRecord {
            user_id: self.user_id.clone(),
            course_id: self.course_id.clone(),
            completed_chapters: self.completed_chapters.clone(),
            current_chapter_id: self.current_chapter_id.clone(),
            percentage: self.completion_percentage(course),
        }
    }
}

/// Outbound progress payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: String,
    pub course_id: String,
    pub completed_chapters: Vec<String>,
    pub current_chapter_id: Option<String>,
    pub percentage: u32,
}

/// Emitted after every completion request, including no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressChanged {
    pub user_id: String,
    pub course_id: String,
    pub chapter_id: String,
    /// `false` when the chapter was already complete and nothing changed.
    pub newly_completed: bool,
    pub percentage: u32,
    pub current_chapter_id: Option<String>,
}

/// Applies completion rules to a [`Progress`] value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressTracker;

impl ProgressTracker {
    pub fn new() -> Self {
        Self
    }

    /// Mark a chapter complete. Completing an already-complete chapter is a no-op.
    ///
    /// The current-chapter pointer only advances when the completed chapter is
    /// the one it points at, so reviewing other chapters leaves it alone.
    pub fn mark_chapter_complete(
        &self,
        course: &Course,
        progress: &mut Progress,
        chapter_id: &str,
        at: DateTime<Utc>,
    ) -> Result<ProgressChanged, EngineError> {
        if progress.course_id != course.id {
            return Err(EngineError::CourseMismatch {
                expected: course.id.clone(),
                actual: progress.course_id.clone(),
            });
        }
        if course.chapter(chapter_id).is_none() {
            return Err(EngineError::ChapterNotFound(chapter_id.to_string()));
        }

        let newly_completed = !progress.is_completed(chapter_id);
        if newly_completed {
            progress.completed_chapters.push(chapter_id.to_string());
            if progress.current_chapter_id.as_deref() == Some(chapter_id) {
                progress.current_chapter_id = course.next_chapter(chapter_id).map(|c| c.id.clone());
            }
            progress.last_activity = Some(at);
            info!(
                user = %progress.user_id,
                chapter = chapter_id,
                percentage = progress.completion_percentage(course),
                "chapter completed"
            );
        } else {
            debug!(user = %progress.user_id, chapter = chapter_id, "chapter already complete");
        }

        Ok(ProgressChanged {
            user_id: progress.user_id.clone(),
            course_id: progress.course_id.clone(),
            chapter_id: chapter_id.to_string(),
            newly_completed,
            percentage: progress.completion_percentage(course),
            current_chapter_id: progress.current_chapter_id.clone(),
        })
    }

    /// A passed quiz completes its chapter. Failed attempts change nothing.
    pub fn on_quiz_passed(
        &self,
        course: &Course,
        progress: &mut Progress,
        attempt: &QuizAttempt,
        at: DateTime<Utc>,
    ) -> Result<Option<ProgressChanged>, EngineError> {
        if !attempt.passed {
            return Ok(None);
        }
        let quiz = course
            .quiz(&attempt.quiz_id)
            .ok_or_else(|| EngineError::QuizNotFound(attempt.quiz_id.clone()))?;
        self.mark_chapter_complete(course, progress, &quiz.chapter_id, at)
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;
    use uuid::Uuid;

    use super::*;
    use crate::model::{Chapter, GradingMode, Quiz, Tier};

    fn course() -> Course {
        let chapter = |id: &str, ordinal| Chapter {
            id: id.into(),
            title: id.into(),
            ordinal,
            min_tier: Tier::Free,
        };
        Course {
            id: "rust-101".into(),
            title: "Rust 101".into(),
            description: String::new(),
            chapters: vec![chapter("ch1", 1), chapter("ch2", 2), chapter("ch3", 3)],
            quizzes: vec![Quiz {
                id: "quiz-ch2".into(),
                chapter_id: "ch2".into(),
                title: String::new(),
                questions: vec![],
            }],
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn attempt(quiz_id: &str, passed: bool) -> QuizAttempt {
        QuizAttempt {
            id: Uuid::nil(),
            user_id: "u".into(),
            quiz_id: quiz_id.into(),
            answers: BTreeMap::new(),
            per_question: vec![],
            total_score: if passed { 10 } else { 0 },
            max_score: 10,
            percentage: if passed { 100 } else { 0 },
            passed,
            grading_mode: GradingMode::Auto,
            submitted_at: now(),
        }
    }

    #[test]
    fn completing_current_chapter_advances_pointer() {
        let course = course();
        let mut progress = Progress::new("u", &course);
        assert_eq!(progress.current_chapter_id.as_deref(), Some("ch1"));

        let changed = ProgressTracker
            .mark_chapter_complete(&course, &mut progress, "ch1", now())
            .unwrap();
        assert!(changed.newly_completed);
        assert_eq!(changed.percentage, 33);
        assert_eq!(progress.current_chapter_id.as_deref(), Some("ch2"));
        assert_eq!(progress.last_activity, Some(now()));
    }

    #[test]
    fn out_of_order_completion_keeps_pointer() {
        let course = course();
        let mut progress = Progress::new("u", &course);
        ProgressTracker
            .mark_chapter_complete(&course, &mut progress, "ch3", now())
            .unwrap();
        assert_eq!(progress.current_chapter_id.as_deref(), Some("ch1"));
        assert_eq!(progress.completion_percentage(&course), 33);
    }

    #[test]
    fn duplicate_completion_is_a_noop() {
        let course = course();
        let mut progress = Progress::new("u", &course);
        ProgressTracker
            .mark_chapter_complete(&course, &mut progress, "ch1", now())
            .unwrap();
        let before = progress.clone();
        let changed = ProgressTracker
            .mark_chapter_complete(&course, &mut progress, "ch1", now())
            .unwrap();
        assert!(!changed.newly_completed);
        assert_eq!(progress, before);
        assert_eq!(progress.completed_chapters.len(), 1);
    }

    #[test]
    fn finishing_last_chapter_clears_pointer() {
        let course = course();
        let mut progress = Progress::new("u", &course);
        for id in ["ch1", "ch2", "ch3"] {
            ProgressTracker
                .mark_chapter_complete(&course, &mut progress, id, now())
                .unwrap();
        }
        assert!(progress.current_chapter_id.is_none());
        assert_eq!(progress.completion_percentage(&course), 100);
    }

    #[test]
    fn unknown_chapter_is_rejected() {
        let course = course();
        let mut progress = Progress::new("u", &course);
        let err = ProgressTracker
            .mark_chapter_complete(&course, &mut progress, "ch9", now())
            .unwrap_err();
        assert!(matches!(err, EngineError::ChapterNotFound(_)));
        assert!(progress.completed_chapters.is_empty());
    }

    #[test]
    fn passed_quiz_completes_its_chapter() {
        let course = course();
        let mut progress = Progress::new("u", &course);

        let none = ProgressTracker
            .on_quiz_passed(&course, &mut progress, &attempt("quiz-ch2", false), now())
            .unwrap();
        assert!(none.is_none());
        assert!(progress.completed_chapters.is_empty());

        let changed = ProgressTracker
            .on_quiz_passed(&course, &mut progress, &attempt("quiz-ch2", true), now())
            .unwrap()
            .unwrap();
        assert_eq!(changed.chapter_id, "ch2");
        assert!(progress.is_completed("ch2"));
    }

    #[test]
    fn progress_from_another_course_is_rejected() {
        let course = course();
        let mut progress = Progress::new("u", &course);
        progress.course_id = "other".into();
        let err = ProgressTracker
            .mark_chapter_complete(&course, &mut progress, "ch1", now())
            .unwrap_err();
        assert!(matches!(err, EngineError::CourseMismatch { .. }));
    }
}
