//! The `studyloop achievements` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use studyloop_core::model::{Tier, User};

use super::Settings;

pub fn execute(settings: &Settings, course_path: PathBuf, user_id: String, tier: Tier) -> Result<()> {
    let (engine, _) = settings.engine(&course_path)?;
    let user = User::new(user_id, tier);
    let achievements = engine.achievements(&user)?;

    let mut table = Table::new();
    table.set_header(vec!["Achievement", "Rarity", "Progress", "Unlocked"]);
    for a in &achievements {
        let unlocked = match a.unlocked_at {
            Some(at) => at.format("%Y-%m-%d").to_string(),
            None if a.unlocked => "yes".to_string(),
            None => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(&a.name),
            Cell::new(a.rarity),
            Cell::new(format!("{}%", a.progress_percent)),
            Cell::new(unlocked),
        ]);
    }
    println!("{table}");

    let unlocked = achievements.iter().filter(|a| a.unlocked).count();
    println!("\n{unlocked} of {} unlocked.", achievements.len());

    Ok(())
}
