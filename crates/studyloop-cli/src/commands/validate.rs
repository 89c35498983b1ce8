//! The `studyloop validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(course_path: PathBuf) -> Result<()> {
    let course = studyloop_core::parser::parse_course(&course_path)?;
    let quiz_questions: usize = course.quizzes.iter().map(|q| q.questions.len()).sum();

    println!(
        "Course: {} ({} chapters, {} quizzes, {} questions)",
        course.title,
        course.chapters.len(),
        course.quizzes.len(),
        quiz_questions
    );

    let warnings = studyloop_core::parser::validate_course(&course);
    for w in &warnings {
        let prefix = w
            .item_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Course is valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
