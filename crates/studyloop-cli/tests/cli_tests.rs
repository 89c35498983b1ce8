//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const COURSE: &str = r#"[course]
id = "rust-101"
title = "Rust 101"

[[chapters]]
id = "ownership"
title = "Ownership"

[[chapters]]
id = "borrowing"
title = "Borrowing"
min_tier = "premium"

[[quizzes]]
id = "ownership-quiz"
chapter = "ownership"

[[quizzes.questions]]
id = "move"
prompt = "What happens to a String after `let b = a;`?"
kind = "multiple_choice"
correct_option = "moved"
options = [
    { id = "copied", text = "It is copied" },
    { id = "moved", text = "It is moved" },
]

[[quizzes.questions]]
id = "drop"
prompt = "When is a value dropped?"
kind = "multiple_choice"
correct_option = "scope"
options = [
    { id = "scope", text = "When its owner goes out of scope" },
    { id = "gc", text = "When the garbage collector runs" },
]

[[quizzes.questions]]
id = "why"
prompt = "Why does Rust need ownership?"
kind = "open_ended"
required = false
"#;

fn studyloop(dir: &Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("studyloop").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env_remove("STUDYLOOP_ANTHROPIC_KEY")
        .env_remove("STUDYLOOP_OPENAI_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("course.toml"), COURSE).unwrap();
    dir
}

fn write_submission(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    studyloop(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created studyloop.toml"))
        .stdout(predicate::str::contains("Created courses/example.toml"));

    assert!(dir.path().join("studyloop.toml").exists());
    assert!(dir.path().join("courses/example.toml").exists());

    studyloop(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists, skipping"));
}

#[test]
fn init_example_course_is_valid() {
    let dir = TempDir::new().unwrap();
    studyloop(dir.path()).arg("init").assert().success();

    studyloop(dir.path())
        .args(["validate", "--course", "courses/example.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 chapters, 1 quizzes, 3 questions"))
        .stdout(predicate::str::contains("Course is valid."));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("broken.toml"),
        r#"[course]
id = "c"
title = "C"

[[chapters]]
id = "one"
title = "One"

[[chapters]]
id = "one"
title = "One again"

[[quizzes]]
id = "orphan"
chapter = "missing"
"#,
    )
    .unwrap();

    studyloop(dir.path())
        .args(["validate", "--course", "broken.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("WARNING"))
        .stdout(predicate::str::contains("warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    let dir = TempDir::new().unwrap();
    studyloop(dir.path())
        .args(["validate", "--course", "nonexistent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn submit_passing_quiz_updates_progress() {
    let dir = workspace();
    write_submission(
        dir.path(),
        "answers.json",
        r#"{"quiz_id": "ownership-quiz", "answers": {"move": "moved", "drop": "scope", "why": "safety"}}"#,
    );

    studyloop(dir.path())
        .args([
            "submit",
            "--course",
            "course.toml",
            "--user",
            "ada",
            "--submission",
            "answers.json",
            "--date",
            "2024-03-01",
            "--state-dir",
            "state",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("20/20 (100%), passed: yes"))
        .stdout(predicate::str::contains("Open-ended answers were not graded."))
        .stdout(predicate::str::contains("Course progress: 50%"))
        .stdout(predicate::str::contains("Achievement unlocked: First Steps"));

    assert!(dir.path().join("state/ada.json").exists());

    studyloop(dir.path())
        .args([
            "progress",
            "--course",
            "course.toml",
            "--user",
            "ada",
            "--state-dir",
            "state",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Course progress: 50%"))
        .stdout(predicate::str::contains("Quiz attempts: 1 (1 passed)"))
        .stdout(predicate::str::contains(
            "premium content requires the premium plan (you are on free). Upgrade to unlock it.",
        ));
}

#[test]
fn progress_respects_tier_flag() {
    let dir = workspace();

    studyloop(dir.path())
        .args([
            "progress",
            "--course",
            "course.toml",
            "--user",
            "ada",
            "--tier",
            "premium",
            "--state-dir",
            "state",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Upgrade to unlock it.").not())
        .stdout(predicate::str::contains("open"));
}

#[test]
fn submit_json_output() {
    let dir = workspace();
    write_submission(
        dir.path(),
        "answers.json",
        r#"{"quiz_id": "ownership-quiz", "answers": {"move": "copied", "drop": "scope"}}"#,
    );

    let output = studyloop(dir.path())
        .args([
            "submit",
            "--course",
            "course.toml",
            "--user",
            "bo",
            "--submission",
            "answers.json",
            "--date",
            "2024-03-01",
            "--state-dir",
            "state",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let outcome: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcome["result"]["total_score"], 10);
    assert_eq!(outcome["result"]["max_score"], 20);
    assert_eq!(outcome["result"]["percentage"], 50);
    assert_eq!(outcome["result"]["passed"], false);
    assert!(outcome.get("streak").is_none());
}

#[test]
fn free_tier_hybrid_request_is_downgraded() {
    let dir = workspace();
    write_submission(
        dir.path(),
        "answers.json",
        r#"{"quiz_id": "ownership-quiz", "answers": {"move": "moved", "drop": "scope"}, "grading_mode": "hybrid"}"#,
    );

    studyloop(dir.path())
        .args([
            "submit",
            "--course",
            "course.toml",
            "--user",
            "cy",
            "--tier",
            "free",
            "--submission",
            "answers.json",
            "--date",
            "2024-03-01",
            "--state-dir",
            "state",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Grading mode hybrid is not available, graded as auto. \
             AI-assisted grading requires the premium plan (you are on free).",
        ));
}

#[test]
fn submit_unknown_quiz_fails() {
    let dir = workspace();
    write_submission(dir.path(), "answers.json", r#"{"quiz_id": "nope"}"#);

    studyloop(dir.path())
        .args([
            "submit",
            "--course",
            "course.toml",
            "--user",
            "ada",
            "--submission",
            "answers.json",
            "--state-dir",
            "state",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quiz not found: nope"));
}

#[test]
fn check_in_and_calendar() {
    let dir = workspace();
    for date in ["2024-03-01", "2024-03-02", "2024-03-03"] {
        studyloop(dir.path())
            .args([
                "check-in",
                "--course",
                "course.toml",
                "--user",
                "ada",
                "--date",
                date,
                "--state-dir",
                "state",
            ])
            .assert()
            .success();
    }

    studyloop(dir.path())
        .args([
            "check-in",
            "--course",
            "course.toml",
            "--user",
            "ada",
            "--date",
            "2024-03-03",
            "--state-dir",
            "state",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("already checked in"))
        .stdout(predicate::str::contains("Current streak: 3 day(s)"));

    studyloop(dir.path())
        .args([
            "calendar", "--user", "ada", "--year", "2024", "--month", "3", "--state-dir", "state",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-03 for ada"))
        .stdout(predicate::str::contains("3 active day(s)"));
}

#[test]
fn calendar_rejects_invalid_month() {
    let dir = TempDir::new().unwrap();
    studyloop(dir.path())
        .args([
            "calendar", "--user", "ada", "--year", "2024", "--month", "13", "--state-dir", "state",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid calendar month"));
}

#[test]
fn complete_chapter_twice() {
    let dir = workspace();
    let args = [
        "complete",
        "--course",
        "course.toml",
        "--user",
        "ada",
        "--chapter",
        "ownership",
        "--date",
        "2024-03-01",
        "--state-dir",
        "state",
    ];

    studyloop(dir.path())
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed chapter ownership."))
        .stdout(predicate::str::contains("Next chapter: borrowing"));

    studyloop(dir.path())
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains("already complete"));

    studyloop(dir.path())
        .args([
            "achievements",
            "--course",
            "course.toml",
            "--user",
            "ada",
            "--state-dir",
            "state",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("First Steps"))
        .stdout(predicate::str::contains("Halfway There"));
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = workspace();
    studyloop(dir.path())
        .args([
            "progress",
            "--course",
            "course.toml",
            "--user",
            "ada",
            "--config",
            "missing.toml",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}
