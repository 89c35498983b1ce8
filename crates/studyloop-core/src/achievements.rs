//! Data-driven achievement rules.
//!
//! Every rule is a predicate over a [`LearnerSnapshot`], never over a raw
//! event, so replaying evaluation from the same snapshot always yields the
//! same unlock set. Events only select which rules are worth re-checking.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::Course;
use crate::progress::Progress;
use crate::results::QuizAttempt;
use crate::streak::{Streak, StreakResult};

/// Static rarity metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rarity::Common => write!(f, "common"),
            Rarity::Rare => write!(f, "rare"),
            Rarity::Epic => write!(f, "epic"),
            Rarity::Legendary => write!(f, "legendary"),
        }
    }
}

/// Aggregate learner state the rules are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerSnapshot {
    pub chapters_completed: u32,
    pub progress_percentage: u32,
    pub longest_streak: u32,
    /// Distinct quizzes with at least one passing attempt.
    pub quizzes_passed: u32,
    /// Distinct quizzes with at least one full-marks attempt.
    pub perfect_scores: u32,
}

impl LearnerSnapshot {
    pub fn capture(
        course: &Course,
        progress: Option<&Progress>,
        streak: &Streak,
        attempts: &[QuizAttempt],
    ) -> Self {
        let passed: BTreeSet<&str> = attempts
            .iter()
            .filter(|a| a.passed)
            .map(|a| a.quiz_id.as_str())
            .collect();
        let perfect: BTreeSet<&str> = attempts
            .iter()
            .filter(|a| a.is_perfect())
            .map(|a| a.quiz_id.as_str())
            .collect();

        Self {
            chapters_completed: progress.map_or(0, |p| p.completed_chapters.len() as u32),
            progress_percentage: progress.map_or(0, |p| p.completion_percentage(course)),
            longest_streak: streak.longest,
            quizzes_passed: passed.len() as u32,
            perfect_scores: perfect.len() as u32,
        }
    }
}

/// An event that may move achievements forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LearningEvent {
    QuizPassed { attempt: QuizAttempt },
    ChapterCompleted { chapter_id: String },
    StreakUpdated { streak: StreakResult },
}

/// Unlock predicate, expressed as a target over one snapshot metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "target", rename_all = "snake_case")]
pub enum AchievementRule {
    ChaptersCompleted(u32),
    CoursePercentage(u32),
    QuizzesPassed(u32),
    PerfectScores(u32),
    StreakDays(u32),
}

impl AchievementRule {
    /// Percent of the target reached, 0..=100.
    pub fn progress(&self, snapshot: &LearnerSnapshot) -> u32 {
        let (have, need) = match *self {
            AchievementRule::ChaptersCompleted(n) => (snapshot.chapters_completed, n),
            AchievementRule::CoursePercentage(n) => (snapshot.progress_percentage, n),
            AchievementRule::QuizzesPassed(n) => (snapshot.quizzes_passed, n),
            AchievementRule::PerfectScores(n) => (snapshot.perfect_scores, n),
            AchievementRule::StreakDays(n) => (snapshot.longest_streak, n),
        };
        if need == 0 {
            return 100;
        }
        (u64::from(have.min(need)) * 100 / u64::from(need)) as u32
    }

    /// Whether `event` can change this rule's metric.
    pub fn watches(&self, event: &LearningEvent) -> bool {
        matches!(
            (self, event),
            (
                AchievementRule::ChaptersCompleted(_) | AchievementRule::CoursePercentage(_),
                LearningEvent::ChapterCompleted { .. }
            ) | (
                AchievementRule::QuizzesPassed(_) | AchievementRule::PerfectScores(_),
                LearningEvent::QuizPassed { .. }
            ) | (
                AchievementRule::StreakDays(_),
                LearningEvent::StreakUpdated { .. }
            )
        )
    }
}

/// A catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct AchievementDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub rarity: Rarity,
    pub rule: AchievementRule,
}

/// The built-in achievement catalog.
pub const CATALOG: &[AchievementDefinition] = &[
    AchievementDefinition {
        id: "first-steps",
        name: "First Steps",
        description: "Complete your first chapter",
        rarity: Rarity::Common,
        rule: AchievementRule::ChaptersCompleted(1),
    },
    AchievementDefinition {
        id: "quiz-rookie",
        name: "Quiz Rookie",
        description: "Pass your first quiz",
        rarity: Rarity::Common,
        rule: AchievementRule::QuizzesPassed(1),
    },
    AchievementDefinition {
        id: "on-fire",
        name: "On Fire",
        description: "Keep a 3-day learning streak",
        rarity: Rarity::Common,
        rule: AchievementRule::StreakDays(3),
    },
    AchievementDefinition {
        id: "perfectionist",
        name: "Perfectionist",
        description: "Score 100% on a quiz",
        rarity: Rarity::Rare,
        rule: AchievementRule::PerfectScores(1),
    },
    AchievementDefinition {
        id: "halfway-there",
        name: "Halfway There",
        description: "Complete 50% of the course",
        rarity: Rarity::Rare,
        rule: AchievementRule::CoursePercentage(50),
    },
    AchievementDefinition {
        id: "week-warrior",
        name: "Week Warrior",
        description: "Keep a 7-day learning streak",
        rarity: Rarity::Rare,
        rule: AchievementRule::StreakDays(7),
    },
    AchievementDefinition {
        id: "quiz-master",
        name: "Quiz Master",
        description: "Pass 10 different quizzes",
        rarity: Rarity::Epic,
        rule: AchievementRule::QuizzesPassed(10),
    },
    AchievementDefinition {
        id: "flawless",
        name: "Flawless",
        description: "Score 100% on 5 different quizzes",
        rarity: Rarity::Epic,
        rule: AchievementRule::PerfectScores(5),
    },
    AchievementDefinition {
        id: "graduate",
        name: "Graduate",
        description: "Complete the whole course",
        rarity: Rarity::Epic,
        rule: AchievementRule::CoursePercentage(100),
    },
    AchievementDefinition {
        id: "unstoppable",
        name: "Unstoppable",
        description: "Keep a 30-day learning streak",
        rarity: Rarity::Legendary,
        rule: AchievementRule::StreakDays(30),
    },
];

/// Per-user unlock state of one achievement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockState {
    pub progress_percent: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Per-user achievement ledger. Entries only ever move towards unlocked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementLedger {
    #[serde(default)]
    entries: BTreeMap<String, UnlockState>,
}

impl AchievementLedger {
    pub fn get(&self, id: &str) -> Option<&UnlockState> {
        self.entries.get(id)
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.entries
            .get(id)
            .is_some_and(|s| s.unlocked_at.is_some())
    }

    pub fn unlocked_count(&self) -> usize {
        self.entries
            .values()
            .filter(|s| s.unlocked_at.is_some())
            .count()
    }
}

/// Outbound achievement payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementUpdate {
    pub achievement_id: String,
    pub name: String,
    pub rarity: Rarity,
    pub unlocked: bool,
    /// `true` only on the evaluation that performed the unlock.
    #[serde(default)]
    pub newly_unlocked: bool,
    pub progress_percent: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Evaluates the catalog against learner snapshots.
#[derive(Debug, Clone, Copy)]
pub struct AchievementEngine {
    catalog: &'static [AchievementDefinition],
}

impl Default for AchievementEngine {
    fn default() -> Self {
        Self { catalog: CATALOG }
    }
}

impl AchievementEngine {
    pub fn catalog(&self) -> &'static [AchievementDefinition] {
        self.catalog
    }

    /// Re-check the rules `event` can affect. Returns entries that unlocked or
    /// whose partial progress moved.
    pub fn evaluate(
        &self,
        ledger: &mut AchievementLedger,
        snapshot: &LearnerSnapshot,
        event: &LearningEvent,
        at: DateTime<Utc>,
    ) -> Vec<AchievementUpdate> {
        self.catalog
            .iter()
            .filter(|def| def.rule.watches(event))
            .filter_map(|def| apply(def, ledger, snapshot, at))
            .collect()
    }

    /// Re-check every rule, e.g. after a replay or a catalog change.
    pub fn reevaluate(
        &self,
        ledger: &mut AchievementLedger,
        snapshot: &LearnerSnapshot,
        at: DateTime<Utc>,
    ) -> Vec<AchievementUpdate> {
        self.catalog
            .iter()
            .filter_map(|def| apply(def, ledger, snapshot, at))
            .collect()
    }

    /// Status of the whole catalog without touching the ledger.
    pub fn view(
        &self,
        ledger: &AchievementLedger,
        snapshot: &LearnerSnapshot,
    ) -> Vec<AchievementUpdate> {
        self.catalog
            .iter()
            .map(|def| match ledger.get(def.id) {
                Some(state) if state.unlocked_at.is_some() => update(def, state, false),
                _ => update(
                    def,
                    &UnlockState {
                        progress_percent: def.rule.progress(snapshot),
                        unlocked_at: None,
                    },
                    false,
                ),
            })
            .collect()
    }
}

fn apply(
    def: &AchievementDefinition,
    ledger: &mut AchievementLedger,
    snapshot: &LearnerSnapshot,
    at: DateTime<Utc>,
) -> Option<AchievementUpdate> {
    let state = ledger.entries.entry(def.id.to_string()).or_default();
    if state.unlocked_at.is_some() {
        return None;
    }

    let progress = def.rule.progress(snapshot);
    if progress >= 100 {
        state.progress_percent = 100;
        state.unlocked_at = Some(at);
        info!(achievement = def.id, rarity = %def.rarity, "achievement unlocked");
        return Some(update(def, state, true));
    }
    if progress != state.progress_percent {
        state.progress_percent = progress;
        return Some(update(def, state, false));
    }
    None
}

fn update(def: &AchievementDefinition, state: &UnlockState, newly_unlocked: bool) -> AchievementUpdate {
    AchievementUpdate {
        achievement_id: def.id.to_string(),
        name: def.name.to_string(),
        rarity: def.rarity,
        unlocked: state.unlocked_at.is_some(),
        newly_unlocked,
        progress_percent: state.progress_percent,
        unlocked_at: state.unlocked_at,
    }
}
