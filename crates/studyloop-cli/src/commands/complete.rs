//! The `studyloop complete` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;

use studyloop_core::model::{Tier, User};

use super::{now, print_unlocks, today, Settings};

pub fn execute(
    settings: &Settings,
    course_path: PathBuf,
    user_id: String,
    tier: Tier,
    chapter_id: String,
    date: Option<NaiveDate>,
) -> Result<()> {
    let (engine, _) = settings.engine(&course_path)?;
    let user = User::new(user_id, tier);

    let outcome = engine.complete_chapter(&user, &chapter_id, today(date), now())?;

    if outcome.newly_completed {
        println!("Completed chapter {chapter_id}.");
    } else {
        println!("Chapter {chapter_id} was already complete.");
    }
    println!("Course progress: {}%", outcome.progress.percentage);
    match &outcome.progress.current_chapter_id {
        Some(next) => println!("Next chapter: {next}"),
        None => println!("No chapter left to start."),
    }
    if let Some(streak) = &outcome.streak {
        println!(
            "Streak: {} day(s), longest {}",
            streak.current_streak, streak.longest_streak
        );
    }
    print_unlocks(&outcome.achievements);

    Ok(())
}
