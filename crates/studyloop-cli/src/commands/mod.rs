pub mod achievements;
pub mod calendar;
pub mod check_in;
pub mod complete;
pub mod init;
pub mod progress;
pub mod submit;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use tracing::debug;

use studyloop_core::engine::LearningEngine;
use studyloop_core::grading::GradingEngine;
use studyloop_core::store::JsonFileStore;
use studyloop_core::traits::FreeTextGrader;
use studyloop_graders::{create_grader, StudyloopConfig};

/// Options shared by every subcommand.
pub struct Settings {
    pub config: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
}

impl Settings {
    pub fn load_config(&self) -> Result<StudyloopConfig> {
        let mut config = studyloop_graders::config::load_config_from(self.config.as_deref())?;
        if let Some(dir) = &self.state_dir {
            config.state_dir = dir.clone();
        }
        Ok(config)
    }

    pub fn store(&self, config: &StudyloopConfig) -> Arc<JsonFileStore> {
        Arc::new(JsonFileStore::new(config.state_dir.clone()))
    }

    /// Build an engine for one course file.
    pub fn engine(&self, course_path: &Path) -> Result<(LearningEngine, StudyloopConfig)> {
        let config = self.load_config()?;
        let course = studyloop_core::parser::parse_course(course_path)?;

        let grader = config.grader.as_ref().map(create_grader).transpose()?;
        debug!(
            course = %course.id,
            state_dir = %config.state_dir.display(),
            grader = grader.as_deref().map_or("none", |g| g.name()),
            "engine ready"
        );
        let grading = GradingEngine::new(grader, config.engine_config());
        let engine = LearningEngine::new(course, grading, self.store(&config));
        Ok((engine, config))
    }
}

/// The activity date, read from the local clock unless given.
pub fn today(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Print achievements that just unlocked.
pub fn print_unlocks(updates: &[studyloop_core::achievements::AchievementUpdate]) {
    for update in updates.iter().filter(|u| u.newly_unlocked) {
        println!(
            "Achievement unlocked: {} ({})",
            update.name, update.rarity
        );
    }
}
