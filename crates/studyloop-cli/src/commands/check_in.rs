//! The `studyloop check-in` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;

use studyloop_core::model::{Tier, User};
use studyloop_core::streak::CheckInKind;

use super::{now, print_unlocks, today, Settings};

pub fn execute(
    settings: &Settings,
    course_path: PathBuf,
    user_id: String,
    tier: Tier,
    date: Option<NaiveDate>,
) -> Result<()> {
    let (engine, _) = settings.engine(&course_path)?;
    let user = User::new(user_id, tier);
    let date = today(date);

    let outcome = engine.check_in(&user, date, now())?;
    let streak = &outcome.streak;

    let note = match streak.kind {
        CheckInKind::Started => "streak started",
        CheckInKind::Continued => "streak continued",
        CheckInKind::AlreadyCheckedIn => "already checked in",
        CheckInKind::Reset => "streak restarted",
        CheckInKind::Backdated => "earlier than the last check-in, ignored",
    };
    println!("Checked in for {date}: {note}.");
    println!(
        "Current streak: {} day(s), longest {}, {} active day(s) in total",
        streak.current_streak, streak.longest_streak, streak.total_active_days
    );
    print_unlocks(&outcome.achievements);

    Ok(())
}
