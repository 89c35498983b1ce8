//! Mock grader for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use studyloop_core::error::GraderError;
use studyloop_core::traits::{FreeTextGrader, GradeRequest, GradeVerdict};

/// Scripted reply for one question.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Award a fraction of the question's maximum (0.0..=1.0).
    Fraction(f64),
    /// Fail with the given error message.
    Fail(String),
    /// Sleep before replying with full marks. Used to exercise timeouts.
    Delay(Duration),
}

/// A grader that answers from a script instead of calling a model.
///
/// Replies are keyed by question id; unscripted questions get full marks.
pub struct MockGrader {
    replies: HashMap<String, MockReply>,
    call_count: AtomicU32,
    last_request: Mutex<Option<GradeRequest>>,
}

impl MockGrader {
    pub fn new(replies: HashMap<String, MockReply>) -> Self {
        Self {
            replies,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// A mock that awards full marks to every answer.
    pub fn full_marks() -> Self {
        Self::new(HashMap::new())
    }

    pub fn with_reply(mut self, question_id: &str, reply: MockReply) -> Self {
        self.replies.insert(question_id.to_string(), reply);
        self
    }

    /// Get the number of calls made to this grader.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this grader.
    pub fn last_request(&self) -> Option<GradeRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }
}

#[async_trait]
impl FreeTextGrader for MockGrader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn grade(&self, request: &GradeRequest) -> Result<GradeVerdict, GraderError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        let max = f64::from(request.max_points);
        match self.replies.get(&request.question_id) {
            Some(MockReply::Fail(message)) => Err(GraderError::Unavailable(message.clone())),
            Some(MockReply::Delay(delay)) => {
                tokio::time::sleep(*delay).await;
                Ok(verdict(max))
            }
            Some(MockReply::Fraction(fraction)) => Ok(verdict(max * fraction.clamp(0.0, 1.0))),
            None => Ok(verdict(max)),
        }
    }
}

fn verdict(score: f64) -> GradeVerdict {
    GradeVerdict {
        score,
        feedback: format!("Mock grade: {score:.1} points."),
        corrections: Vec::new(),
        strengths: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(question_id: &str) -> GradeRequest {
        GradeRequest {
            question_id: question_id.into(),
            question: "Explain".into(),
            rubric_context: String::new(),
            answer: "Because".into(),
            max_points: 20,
        }
    }

    #[tokio::test]
    async fn unscripted_questions_get_full_marks() {
        let grader = MockGrader::full_marks();
        let verdict = grader.grade(&request("any")).await.unwrap();
        assert_eq!(verdict.score, 20.0);
        assert_eq!(grader.call_count(), 1);
        assert_eq!(grader.last_request().unwrap().question_id, "any");
    }

    #[tokio::test]
    async fn scripted_fraction_and_failure() {
        let grader = MockGrader::full_marks()
            .with_reply("half", MockReply::Fraction(0.5))
            .with_reply("broken", MockReply::Fail("offline".into()));

        assert_eq!(grader.grade(&request("half")).await.unwrap().score, 10.0);
        let err = grader.grade(&request("broken")).await.unwrap_err();
        assert!(err.to_string().contains("offline"));
        assert_eq!(grader.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_reply_waits() {
        let grader = MockGrader::full_marks().with_reply("slow", MockReply::Delay(Duration::from_secs(90)));
        let result =
            tokio::time::timeout(Duration::from_secs(30), grader.grade(&request("slow"))).await;
        assert!(result.is_err());
    }
}
