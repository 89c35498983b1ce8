//! The `studyloop calendar` command.

use anyhow::Result;
use chrono::Datelike;
use comfy_table::{Cell, Table};

use studyloop_core::store::{LearnerRecord, LearnerStore};
use studyloop_core::streak::StreakCalculator;

use super::Settings;

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

pub fn execute(settings: &Settings, user_id: String, year: i32, month: u32) -> Result<()> {
    let config = settings.load_config()?;
    let store = settings.store(&config);
    let record = store
        .load(&user_id)?
        .unwrap_or_else(|| LearnerRecord::new(&user_id));

    let view = StreakCalculator::new().calendar(&record.streak, year, month)?;

    let mut table = Table::new();
    table.set_header(WEEKDAYS.to_vec());

    let mut row: Vec<Cell> = Vec::with_capacity(7);
    if let Some(first) = view.days.first() {
        let offset = first.date.weekday().num_days_from_monday();
        row.extend((0..offset).map(|_| Cell::new("")));
    }
    for day in &view.days {
        let label = match day.streak_day_index {
            Some(index) => format!("{:>2} *{index}", day.date.day()),
            None => format!("{:>2}", day.date.day()),
        };
        row.push(Cell::new(label));
        if row.len() == 7 {
            table.add_row(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        table.add_row(row);
    }

    println!("{year}-{month:02} for {user_id}");
    println!("{table}");
    println!(
        "{} active day(s); *N marks the Nth day of a running streak.",
        view.active_days()
    );

    Ok(())
}
