//! The `studyloop init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("studyloop.toml").exists() {
        println!("studyloop.toml already exists, skipping.");
    } else {
        std::fs::write("studyloop.toml", SAMPLE_CONFIG)?;
        println!("Created studyloop.toml");
    }

    std::fs::create_dir_all("courses")?;
    let example_path = std::path::Path::new("courses/example.toml");
    if example_path.exists() {
        println!("courses/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_COURSE)?;
        println!("Created courses/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit studyloop.toml to pick a grader for open-ended answers");
    println!("  2. Run: studyloop validate --course courses/example.toml");
    println!("  3. Run: studyloop progress --course courses/example.toml --user you");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# studyloop configuration

grader_timeout_secs = 30
state_dir = "./studyloop-state"
default_grading_mode = "auto"

# Free-text grader used by hybrid and llm grading (premium tiers only).
# [grader]
# type = "anthropic"
# api_key = "${ANTHROPIC_API_KEY}"

# [grader]
# type = "openai"
# api_key = "${OPENAI_API_KEY}"
# model = "gpt-4.1-mini"
"#;

const EXAMPLE_COURSE: &str = r#"[course]
id = "example"
title = "Example Course"
description = "A small course to get started"

[[chapters]]
id = "basics"
title = "Basics"

[[chapters]]
id = "deeper"
title = "Going Deeper"
min_tier = "premium"

[[quizzes]]
id = "basics-quiz"
chapter = "basics"
title = "Basics check"

[[quizzes.questions]]
id = "capital"
prompt = "What is the capital of France?"
kind = "multiple_choice"
correct_option = "paris"
explanation = "Paris has been the capital since the 10th century."
options = [
    { id = "paris", text = "Paris" },
    { id = "lyon", text = "Lyon" },
    { id = "nice", text = "Nice" },
]

[[quizzes.questions]]
id = "sum"
prompt = "What is 2 + 2?"
kind = "multiple_choice"
correct_option = "four"
options = [
    { id = "three", text = "3" },
    { id = "four", text = "4" },
]

[[quizzes.questions]]
id = "reflect"
prompt = "In one sentence, why do you want to learn this?"
kind = "open_ended"
points = 10
rubric = "Any sincere, complete sentence earns full marks"
required = false
"#;
