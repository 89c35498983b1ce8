//! Engine and grader error types.
//!
//! `GraderError` lives here rather than in `studyloop-graders` so the grading
//! engine can classify collaborator failures without string matching.

use thiserror::Error;

/// Errors reported to callers of the engine. None of them leave partial state.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The submission names a quiz that does not exist in the course.
    #[error("quiz not found: {0}")]
    QuizNotFound(String),

    /// The submission does not match the quiz it targets.
    #[error("malformed submission: {0}")]
    MalformedSubmission(String),

    /// A chapter id outside the course.
    #[error("chapter not found: {0}")]
    ChapterNotFound(String),

    /// Progress for one course was applied to another.
    #[error("progress belongs to course '{actual}', expected '{expected}'")]
    CourseMismatch { expected: String, actual: String },

    /// A calendar was requested for a month that does not exist.
    #[error("invalid calendar month {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },

    /// The persistence collaborator failed.
    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),
}

/// Failures of the external free-text grading service.
///
/// Every variant is non-fatal to a submission: the affected question scores
/// zero and the attempt is flagged as a partial failure.
#[derive(Debug, Error)]
pub enum GraderError {
    /// The grader did not answer within the engine's timeout.
    #[error("grading request timed out after {0}s")]
    Timeout(u64),

    /// The service is not configured or refused the request.
    #[error("grading service unavailable: {0}")]
    Unavailable(String),

    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The grader answered but the verdict could not be understood.
    #[error("invalid grading verdict: {0}")]
    InvalidVerdict(String),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_readable() {
        let err = EngineError::InvalidMonth {
            year: 2024,
            month: 13,
        };
        assert_eq!(err.to_string(), "invalid calendar month 2024-13");
        let err = EngineError::Storage(anyhow::anyhow!("disk full"));
        assert!(err.to_string().contains("disk full"));
    }
}
