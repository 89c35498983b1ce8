//! Core data model types for studyloop.
//!
//! Courses, chapters, quizzes and questions are published content and never
//! change once loaded. Users carry the subscription tier handed to us by the
//! session layer.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Percentage a quiz attempt must reach to pass.
pub const PASS_THRESHOLD_PERCENT: u32 = 70;

/// Point value of a question when the author does not set one.
pub const DEFAULT_QUESTION_POINTS: u32 = 10;

/// Upper bound on the point value of an open-ended question.
pub const MAX_OPEN_ENDED_POINTS: u32 = 30;

/// Subscription level. Ordered: `Free < Premium < Pro`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Premium,
    Pro,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Free => write!(f, "free"),
            Tier::Premium => write!(f, "premium"),
            Tier::Pro => write!(f, "pro"),
        }
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "premium" => Ok(Tier::Premium),
            "pro" => Ok(Tier::Pro),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

/// A learner as seen by the engine. The tier is read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub tier: Tier,
}

impl User {
    pub fn new(id: impl Into<String>, tier: Tier) -> Self {
        Self {
            id: id.into(),
            tier,
        }
    }
}

/// Strategy used to score a quiz submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradingMode {
    /// Rule-based multiple-choice scoring only.
    #[default]
    Auto,
    /// Rule-based multiple-choice plus delegated open-ended answers.
    Hybrid,
    /// Every answer is delegated to the free-text grader.
    #[serde(rename = "llm")]
    LlmOnly,
}

impl fmt::Display for GradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradingMode::Auto => write!(f, "auto"),
            GradingMode::Hybrid => write!(f, "hybrid"),
            GradingMode::LlmOnly => write!(f, "llm"),
        }
    }
}

impl FromStr for GradingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(GradingMode::Auto),
            "hybrid" => Ok(GradingMode::Hybrid),
            "llm" | "llm_only" | "llmonly" => Ok(GradingMode::LlmOnly),
            other => Err(format!("unknown grading mode: {other}")),
        }
    }
}

/// A published chapter of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    /// Position within the course, starting at 1.
    pub ordinal: u32,
    /// Lowest tier allowed to open this chapter's content.
    #[serde(default)]
    pub min_tier: Tier,
}

/// A course: a fixed set of chapters and the quizzes attached to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
}

impl Course {
    pub fn chapter(&self, id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn quiz(&self, id: &str) -> Option<&Quiz> {
        self.quizzes.iter().find(|q| q.id == id)
    }

    pub fn total_chapters(&self) -> usize {
        self.chapters.len()
    }

    /// Chapters sorted by ordinal position.
    pub fn ordered_chapters(&self) -> Vec<&Chapter> {
        let mut chapters: Vec<&Chapter> = self.chapters.iter().collect();
        chapters.sort_by_key(|c| c.ordinal);
        chapters
    }

    pub fn first_chapter(&self) -> Option<&Chapter> {
        self.chapters.iter().min_by_key(|c| c.ordinal)
    }

    /// The chapter with the smallest ordinal greater than the given chapter's.
    pub fn next_chapter(&self, id: &str) -> Option<&Chapter> {
        let current = self.chapter(id)?;
        self.chapters
            .iter()
            .filter(|c| c.ordinal > current.ordinal)
            .min_by_key(|c| c.ordinal)
    }
}

/// A quiz attached to one chapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub chapter_id: String,
    #[serde(default)]
    pub title: String,
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

/// A single quiz question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub kind: QuestionKind,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default)]
    pub explanation: String,
    /// Optional questions left blank are excluded from the maximum score.
    #[serde(default = "default_true")]
    pub required: bool,
}

impl Question {
    /// Points this question is worth. Open-ended values are capped.
    pub fn max_points(&self) -> u32 {
        match self.kind {
            QuestionKind::MultipleChoice { .. } => self.points,
            QuestionKind::OpenEnded { .. } => self.points.min(MAX_OPEN_ENDED_POINTS),
        }
    }

    pub fn is_open_ended(&self) -> bool {
        matches!(self.kind, QuestionKind::OpenEnded { .. })
    }
}

fn default_points() -> u32 {
    DEFAULT_QUESTION_POINTS
}

fn default_true() -> bool {
    true
}

/// Shape of a question's expected answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<AnswerOption>,
        /// Identifier of the correct option.
        correct_option: String,
    },
    OpenEnded {
        /// Grading guidance forwarded to the free-text grader.
        #[serde(default)]
        rubric: Option<String>,
    },
}

/// One selectable option of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    pub text: String,
}

/// A learner's answers to one quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub quiz_id: String,
    /// Question id to raw answer text (an option id for multiple-choice).
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
    #[serde(default)]
    pub grading_mode: GradingMode,
}
