//! studyloop-core: learning progress and assessment engine.
//!
//! This crate defines the data model, the deterministic grading, progress,
//! streak and achievement rules, and the orchestrator that wires them
//! together around a persistence collaborator.

pub mod access;
pub mod achievements;
pub mod engine;
pub mod error;
pub mod grading;
pub mod model;
pub mod parser;
pub mod progress;
pub mod results;
pub mod store;
pub mod streak;
pub mod traits;
