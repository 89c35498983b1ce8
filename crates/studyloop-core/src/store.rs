//! Persistence collaborator for per-user learner state.
//!
//! The engine performs read-modify-write against a store without locking of
//! its own; callers serialize writes per user.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::achievements::AchievementLedger;
use crate::model::Course;
use crate::progress::Progress;
use crate::results::QuizAttempt;
use crate::streak::Streak;

/// Everything the engine keeps about one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerRecord {
    pub user_id: String,
    /// Progress keyed by course id.
    #[serde(default)]
    pub progress: BTreeMap<String, Progress>,
    pub streak: Streak,
    #[serde(default)]
    pub achievements: AchievementLedger,
    /// Append-only attempt history, oldest first.
    #[serde(default)]
    pub attempts: Vec<QuizAttempt>,
}

impl LearnerRecord {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            progress: BTreeMap::new(),
            streak: Streak::new(user_id),
            achievements: AchievementLedger::default(),
            attempts: Vec::new(),
        }
    }

    /// Progress for `course`, created at the first chapter if missing.
    pub fn progress_mut(&mut self, course: &Course) -> &mut Progress {
        let user_id = self.user_id.clone();
        self.progress
            .entry(course.id.clone())
            .or_insert_with(|| Progress::new(&user_id, course))
    }
}

/// Load/save learner records.
pub trait LearnerStore: Send + Sync {
    fn load(&self, user_id: &str) -> Result<Option<LearnerRecord>>;

    fn save(&self, record: &LearnerRecord) -> Result<()>;
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, LearnerRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LearnerStore for MemoryStore {
    fn load(&self, user_id: &str) -> Result<Option<LearnerRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("learner store lock poisoned"))?;
        Ok(records.get(user_id).cloned())
    }

    fn save(&self, record: &LearnerRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("learner store lock poisoned"))?;
        records.insert(record.user_id.clone(), record.clone());
        Ok(())
    }
}

/// One pretty-printed JSON file per user under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        let file_stem: String = user_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file_stem}.json"))
    }
}

impl LearnerStore for JsonFileStore {
    fn load(&self, user_id: &str) -> Result<Option<LearnerRecord>> {
        let path = self.path_for(user_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read learner state from {}", path.display()))?;
        let record = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse learner state {}", path.display()))?;
        Ok(Some(record))
    }

    fn save(&self, record: &LearnerRecord) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create state dir {}", self.dir.display()))?;
        let path = self.path_for(&record.user_id);
        let json =
            serde_json::to_string_pretty(record).context("failed to serialize learner state")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write learner state to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::streak::StreakCalculator;

    fn record_with_activity() -> LearnerRecord {
        let mut record = LearnerRecord::new("ada@example.com");
        StreakCalculator::new()
            .check_in(&mut record.streak, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        record
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load("ada@example.com").unwrap().is_none());
        let record = record_with_activity();
        store.save(&record).unwrap();
        assert_eq!(store.load("ada@example.com").unwrap(), Some(record));
    }

    #[test]
    fn json_store_sanitizes_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state"));
        let record = record_with_activity();
        store.save(&record).unwrap();

        assert!(dir.path().join("state/ada_example_com.json").exists());
        let loaded = store.load("ada@example.com").unwrap().unwrap();
        assert_eq!(loaded.streak.current, 1);
        assert!(store.load("nobody").unwrap().is_none());
    }

    #[test]
    fn json_store_reports_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let store = JsonFileStore::new(dir.path());
        let err = store.load("bad").unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse"));
    }
}
