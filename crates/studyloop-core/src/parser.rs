//! TOML course parser.
//!
//! Loads published courses from TOML files and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{
    AnswerOption, Chapter, Course, Question, QuestionKind, Quiz, Tier, DEFAULT_QUESTION_POINTS,
    MAX_OPEN_ENDED_POINTS,
};

/// Intermediate TOML structure for parsing course files.
#[derive(Debug, Deserialize)]
struct TomlCourseFile {
    course: TomlCourseHeader,
    #[serde(default)]
    chapters: Vec<TomlChapter>,
    #[serde(default)]
    quizzes: Vec<TomlQuiz>,
}

#[derive(Debug, Deserialize)]
struct TomlCourseHeader {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlChapter {
    id: String,
    title: String,
    #[serde(default)]
    ordinal: Option<u32>,
    #[serde(default)]
    min_tier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlQuiz {
    id: String,
    chapter: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    prompt: String,
    kind: String,
    #[serde(default)]
    options: Vec<TomlOption>,
    #[serde(default)]
    correct_option: Option<String>,
    #[serde(default)]
    points: Option<u32>,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    rubric: Option<String>,
    #[serde(default = "default_true")]
    required: bool,
}

#[derive(Debug, Deserialize)]
struct TomlOption {
    id: String,
    text: String,
}

fn default_true() -> bool {
    true
}

/// Parse a single TOML file into a `Course`.
pub fn parse_course(path: &Path) -> Result<Course> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read course file: {}", path.display()))?;

    parse_course_str(&content, path)
}

/// Parse a TOML string into a `Course` (useful for testing).
pub fn parse_course_str(content: &str, source_path: &Path) -> Result<Course> {
    let parsed: TomlCourseFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let chapters = parsed
        .chapters
        .into_iter()
        .enumerate()
        .map(|(index, c)| {
            let min_tier = c
                .min_tier
                .map(|t| t.parse::<Tier>().map_err(|e| anyhow::anyhow!("{}", e)))
                .transpose()?
                .unwrap_or_default();
            Ok(Chapter {
                id: c.id,
                title: c.title,
                ordinal: c.ordinal.unwrap_or(index as u32 + 1),
                min_tier,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let quizzes = parsed
        .quizzes
        .into_iter()
        .map(|q| {
            let questions = q
                .questions
                .into_iter()
                .map(|question| convert_question(&q.id, question))
                .collect::<Result<Vec<_>>>()?;
            Ok(Quiz {
                id: q.id,
                chapter_id: q.chapter,
                title: q.title,
                questions,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Course {
        id: parsed.course.id,
        title: parsed.course.title,
        description: parsed.course.description,
        chapters,
        quizzes,
    })
}

fn convert_question(quiz_id: &str, q: TomlQuestion) -> Result<Question> {
    let kind = match q.kind.to_lowercase().as_str() {
        "multiple_choice" | "choice" | "mc" => {
            let correct_option = q.correct_option.with_context(|| {
                format!("question '{}' in quiz '{quiz_id}' has no correct_option", q.id)
            })?;
            QuestionKind::MultipleChoice {
                options: q
                    .options
                    .into_iter()
                    .map(|o| AnswerOption {
                        id: o.id,
                        text: o.text,
                    })
                    .collect(),
                correct_option,
            }
        }
        "open_ended" | "open" | "free_text" => QuestionKind::OpenEnded { rubric: q.rubric },
        other => anyhow::bail!(
            "question '{}' in quiz '{quiz_id}' has unknown kind: {other}",
            q.id
        ),
    };

    Ok(Question {
        id: q.id,
        prompt: q.prompt,
        kind,
        points: q.points.unwrap_or(DEFAULT_QUESTION_POINTS),
        explanation: q.explanation,
        required: q.required,
    })
}

/// A warning from course validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The chapter, quiz or question id (if applicable).
    pub item_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn item(id: &str, message: impl Into<String>) -> Self {
        Self {
            item_id: Some(id.to_string()),
            message: message.into(),
        }
    }
}

/// Validate a course for common authoring issues.
pub fn validate_course(course: &Course) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if course.chapters.is_empty() {
        warnings.push(ValidationWarning {
            item_id: None,
            message: "course has no chapters".into(),
        });
    }

    let mut seen_chapters = HashSet::new();
    let mut seen_ordinals = HashSet::new();
    for chapter in &course.chapters {
        if !seen_chapters.insert(chapter.id.as_str()) {
            warnings.push(ValidationWarning::item(
                &chapter.id,
                format!("duplicate chapter ID: {}", chapter.id),
            ));
        }
        if !seen_ordinals.insert(chapter.ordinal) {
            warnings.push(ValidationWarning::item(
                &chapter.id,
                format!("duplicate chapter ordinal: {}", chapter.ordinal),
            ));
        }
    }

    let mut seen_quizzes = HashSet::new();
    for quiz in &course.quizzes {
        if !seen_quizzes.insert(quiz.id.as_str()) {
            warnings.push(ValidationWarning::item(
                &quiz.id,
                format!("duplicate quiz ID: {}", quiz.id),
            ));
        }
        if course.chapter(&quiz.chapter_id).is_none() {
            warnings.push(ValidationWarning::item(
                &quiz.id,
                format!("quiz references unknown chapter: {}", quiz.chapter_id),
            ));
        }
        if quiz.questions.is_empty() {
            warnings.push(ValidationWarning::item(&quiz.id, "quiz has no questions"));
        }

        let mut seen_questions = HashSet::new();
        for question in &quiz.questions {
            if !seen_questions.insert(question.id.as_str()) {
                warnings.push(ValidationWarning::item(
                    &question.id,
                    format!("duplicate question ID in quiz {}: {}", quiz.id, question.id),
                ));
            }
            if question.prompt.trim().is_empty() {
                warnings.push(ValidationWarning::item(&question.id, "prompt is empty"));
            }
            match &question.kind {
                QuestionKind::MultipleChoice {
                    options,
                    correct_option,
                } => {
                    if options.is_empty() {
                        warnings.push(ValidationWarning::item(
                            &question.id,
                            "multiple-choice question has no options",
                        ));
                    } else if !options.iter().any(|o| &o.id == correct_option) {
                        warnings.push(ValidationWarning::item(
                            &question.id,
                            format!("correct option '{correct_option}' is not among the options"),
                        ));
                    }
                }
                QuestionKind::OpenEnded { .. } => {
                    if question.points > MAX_OPEN_ENDED_POINTS {
                        warnings.push(ValidationWarning::item(
                            &question.id,
                            format!(
                                "open-ended question worth {} points will be capped at {MAX_OPEN_ENDED_POINTS}",
                                question.points
                            ),
                        ));
                    }
                }
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[course]
id = "rust-101"
title = "Rust 101"
description = "Ownership from first principles"

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
title = "Ownership check"

[[quizzes.questions]]
id = "move"
prompt = "What happens to `a` after `let b = a;` for a String?"
kind = "multiple_choice"
correct_option = "moved"
explanation = "String is not Copy, so the value moves."
options = [
    { id = "copied", text = "It is copied" },
    { id = "moved", text = "It is moved" },
]

[[quizzes.questions]]
id = "why"
prompt = "Why does Rust need ownership?"
kind = "open_ended"
points = 20
rubric = "Mentions memory safety without a garbage collector"
required = false
"#;

    #[test]
    fn parse_valid_toml() {
        let course = parse_course_str(VALID_TOML, &PathBuf::from("course.toml")).unwrap();
        assert_eq!(course.id, "rust-101");
        assert_eq!(course.chapters.len(), 2);
        assert_eq!(course.chapters[1].ordinal, 2);
        assert_eq!(course.chapters[1].min_tier, Tier::Premium);

        let quiz = course.quiz("ownership-quiz").unwrap();
        assert_eq!(quiz.chapter_id, "ownership");
        assert_eq!(quiz.questions[0].points, DEFAULT_QUESTION_POINTS);
        assert!(quiz.questions[1].is_open_ended());
        assert_eq!(quiz.questions[1].points, 20);
        assert!(!quiz.questions[1].required);
        assert!(validate_course(&course).is_empty());
    }

    #[test]
    fn multiple_choice_requires_correct_option() {
        let toml = r#"
[course]
id = "c"
title = "C"

[[quizzes]]
id = "q"
chapter = "x"

[[quizzes.questions]]
id = "broken"
prompt = "?"
kind = "multiple_choice"
"#;
        let err = parse_course_str(toml, &PathBuf::from("c.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("no correct_option"));
    }

    #[test]
    fn unknown_question_kind_is_rejected() {
        let toml = r#"
[course]
id = "c"
title = "C"

[[quizzes]]
id = "q"
chapter = "x"

[[quizzes.questions]]
id = "odd"
prompt = "?"
kind = "matching"
"#;
        assert!(parse_course_str(toml, &PathBuf::from("c.toml")).is_err());
    }

    #[test]
    fn validate_reports_authoring_issues() {
        let toml = r#"
[course]
id = "c"
title = "C"

[[chapters]]
id = "one"
title = "One"
ordinal = 1

[[chapters]]
id = "one"
title = "Also one"
ordinal = 1

[[quizzes]]
id = "q"
chapter = "ghost"

[[quizzes.questions]]
id = "pick"
prompt = "Pick"
kind = "multiple_choice"
correct_option = "z"
options = [{ id = "a", text = "A" }]

[[quizzes.questions]]
id = "essay"
prompt = "Write"
kind = "open_ended"
points = 45
"#;
        let course = parse_course_str(toml, &PathBuf::from("c.toml")).unwrap();
        let warnings = validate_course(&course);
        let messages: Vec<&str> = warnings.iter().map(|w| w.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("duplicate chapter ID")));
        assert!(messages.iter().any(|m| m.contains("duplicate chapter ordinal")));
        assert!(messages.iter().any(|m| m.contains("unknown chapter")));
        assert!(messages.iter().any(|m| m.contains("not among the options")));
        assert!(messages.iter().any(|m| m.contains("capped at 30")));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        assert!(parse_course_str(bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn parse_course_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("course.toml");
        std::fs::write(&path, VALID_TOML).unwrap();
        let course = parse_course(&path).unwrap();
        assert_eq!(course.title, "Rust 101");
        assert!(parse_course(&dir.path().join("missing.toml")).is_err());
    }
}
