//! The `studyloop progress` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use studyloop_core::access::AccessDecision;
use studyloop_core::model::{Tier, User};

use super::{today, yes_no, Settings};

pub fn execute(settings: &Settings, course_path: PathBuf, user_id: String, tier: Tier) -> Result<()> {
    let (engine, _) = settings.engine(&course_path)?;
    let user = User::new(user_id, tier);

    let progress = engine.progress(&user)?;
    let streak = engine.streak(&user, today(None))?;
    let attempts = engine.attempts(&user, None)?;

    let mut table = Table::new();
    table.set_header(vec!["#", "Chapter", "Completed", "Content"]);
    for chapter in engine.course().ordered_chapters() {
        let marker = if progress.current_chapter_id.as_deref() == Some(chapter.id.as_str()) {
            "> "
        } else {
            ""
        };
        let content = match engine.chapter_access(&user, &chapter.id)? {
            AccessDecision::Allowed => "open".to_string(),
            AccessDecision::Denied(reason) => reason.upgrade_prompt(),
        };
        table.add_row(vec![
            Cell::new(chapter.ordinal),
            Cell::new(format!("{marker}{}", chapter.title)),
            Cell::new(yes_no(progress.completed_chapters.contains(&chapter.id))),
            Cell::new(content),
        ]);
    }

    println!("{} for {}", engine.course().title, progress.user_id);
    println!("{table}");
    println!("\nCourse progress: {}%", progress.percentage);
    println!(
        "Streak: {} day(s), longest {}, {} active day(s)",
        streak.current_streak, streak.longest_streak, streak.total_active_days
    );
    println!(
        "Quiz attempts: {} ({} passed)",
        attempts.len(),
        attempts.iter().filter(|a| a.passed).count()
    );

    Ok(())
}
