//! Day-based learning streaks and the calendar view.
//!
//! Dates are always supplied by the caller. Nothing here reads a clock, so a
//! streak is a pure function of its prior state and the check-in date.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::EngineError;

/// One user's streak state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub user_id: String,
    pub current: u32,
    pub longest: u32,
    pub last_check_in: Option<NaiveDate>,
    /// Every day with a recorded check-in.
    #[serde(default)]
    pub active_dates: BTreeSet<NaiveDate>,
}

impl Streak {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }

    /// The streak as it should be shown on `today`: zero once a full day has
    /// been missed, even though `current` only resets on the next check-in.
    pub fn effective_current(&self, today: NaiveDate) -> u32 {
        match self.last_check_in {
            Some(last) if (today - last).num_days() <= 1 => self.current,
            _ => 0,
        }
    }

    pub fn record(&self) -> StreakRecord {
        StreakRecord {
            user_id: self.user_id.clone(),
            current_streak: self.current,
            longest_streak: self.longest,
            total_active_days: self.active_dates.len() as u32,
        }
    }
}

/// Outbound streak payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub user_id: String,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_active_days: u32,
}

/// What a check-in did to the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInKind {
    /// First check-in ever.
    Started,
    /// The day after the previous check-in.
    Continued,
    /// Same day as the previous check-in; nothing changed.
    AlreadyCheckedIn,
    /// At least one day was missed; the streak restarted at 1.
    Reset,
    /// Earlier than the previous check-in; ignored.
    Backdated,
}

/// Result of a check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakResult {
    pub user_id: String,
    pub date: NaiveDate,
    pub kind: CheckInKind,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_active_days: u32,
}

/// One day of a month view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub active: bool,
    /// 1-based position of this day inside its run of consecutive active days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streak_day_index: Option<u32>,
}

/// A month of activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarView {
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
}

impl CalendarView {
    pub fn active_days(&self) -> usize {
        self.days.iter().filter(|d| d.active).count()
    }
}

/// Applies check-in rules and builds calendar views.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreakCalculator;

impl StreakCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Record activity on `date`. At most one check-in per calendar day counts.
    pub fn check_in(&self, streak: &mut Streak, date: NaiveDate) -> StreakResult {
        let kind = match streak.last_check_in {
            None => CheckInKind::Started,
            Some(last) if date == last => CheckInKind::AlreadyCheckedIn,
            Some(last) if date < last => CheckInKind::Backdated,
            Some(last) if last.succ_opt() == Some(date) => CheckInKind::Continued,
            Some(_) => CheckInKind::Reset,
        };

        match kind {
            CheckInKind::Started | CheckInKind::Reset => streak.current = 1,
            CheckInKind::Continued => streak.current += 1,
            CheckInKind::AlreadyCheckedIn | CheckInKind::Backdated => {}
        }

        if matches!(
            kind,
            CheckInKind::Started | CheckInKind::Continued | CheckInKind::Reset
        ) {
            streak.last_check_in = Some(date);
            streak.active_dates.insert(date);
            streak.longest = streak.longest.max(streak.current);
            info!(
                user = %streak.user_id,
                %date,
                current = streak.current,
                longest = streak.longest,
                "streak check-in"
            );
        } else {
            debug!(user = %streak.user_id, %date, ?kind, "check-in ignored");
        }

        StreakResult {
            user_id: streak.user_id.clone(),
            date,
            kind,
            current_streak: streak.current,
            longest_streak: streak.longest,
            total_active_days: streak.active_dates.len() as u32,
        }
    }

    /// Month view with each active day's position inside its streak run.
    ///
    /// Runs that began in an earlier month keep counting, so the first of the
    /// month can be "day 12" of a streak.
    pub fn calendar(
        &self,
        streak: &Streak,
        year: i32,
        month: u32,
    ) -> Result<CalendarView, EngineError> {
        let first =
            NaiveDate::from_ymd_opt(year, month, 1).ok_or(EngineError::InvalidMonth { year, month })?;

        let mut run = 0u32;
        let mut expected = first.pred_opt();
        for day in streak.active_dates.range(..first).rev() {
            if Some(*day) != expected {
                break;
            }
            run += 1;
            expected = day.pred_opt();
        }

        let days = first
            .iter_days()
            .take_while(|d| d.month() == month)
            .map(|date| {
                if streak.active_dates.contains(&date) {
                    run += 1;
                    CalendarDay {
                        date,
                        active: true,
                        streak_day_index: Some(run),
                    }
                } else {
                    run = 0;
                    CalendarDay {
                        date,
                        active: false,
                        streak_day_index: None,
                    }
                }
            })
            .collect();

        Ok(CalendarView { year, month, days })
    }
}
