//! studyloop-graders: free-text grading collaborators.
//!
//! Implements the `FreeTextGrader` trait for Anthropic and OpenAI-compatible
//! endpoints, plus a scriptable mock, and loads the `studyloop.toml`
//! configuration that selects between them.

pub mod anthropic;
pub mod config;
pub mod mock;
pub mod openai;
pub mod prompt;

pub use config::{create_grader, load_config, GraderConfig, StudyloopConfig};
pub use studyloop_core::error::GraderError;
