//! Grading prompt construction and verdict parsing shared by the LLM graders.

use serde::Deserialize;

use studyloop_core::error::GraderError;
use studyloop_core::traits::{GradeRequest, GradeVerdict};

/// System prompt for free-text grading.
pub const SYSTEM_PROMPT: &str = "You are a fair, encouraging tutor grading a student's answer. \
Respond ONLY with a JSON object of the form \
{\"score\": number, \"feedback\": string, \"corrections\": [string], \"strengths\": [string]}. \
The score must be between 0 and the maximum points given. Do not include any other text.";

/// Render the user message for one grading request.
pub fn build_prompt(request: &GradeRequest) -> String {
    let mut prompt = format!("Question:\n{}\n\n", request.question);
    if !request.rubric_context.trim().is_empty() {
        prompt.push_str(&format!("Grading context:\n{}\n", request.rubric_context.trim()));
        prompt.push('\n');
    }
    prompt.push_str(&format!("Maximum points: {}\n\n", request.max_points));
    prompt.push_str(&format!("Student answer:\n{}\n", request.answer));
    prompt
}

#[derive(Deserialize)]
struct RawVerdict {
    score: f64,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    corrections: Vec<String>,
    #[serde(default)]
    strengths: Vec<String>,
}

/// Parse a grader reply into a verdict.
///
/// Accepts a bare JSON object, a ```json fenced block, or an object embedded
/// in surrounding prose.
pub fn parse_verdict(response: &str) -> Result<GradeVerdict, GraderError> {
    let json = extract_json(response)
        .ok_or_else(|| GraderError::InvalidVerdict("no JSON object in grader reply".into()))?;
    let raw: RawVerdict = serde_json::from_str(json)
        .map_err(|e| GraderError::InvalidVerdict(format!("failed to parse verdict: {e}")))?;
    if !raw.score.is_finite() {
        return Err(GraderError::InvalidVerdict("score is not a number".into()));
    }
    Ok(GradeVerdict {
        score: raw.score,
        feedback: raw.feedback,
        corrections: raw.corrections,
        strengths: raw.strengths,
    })
}

fn extract_json(response: &str) -> Option<&str> {
    let mut in_block = false;
    let mut block_start = 0;
    let mut offset = 0;

    for line in response.split_inclusive('\n') {
        let trimmed = line.trim();
        if !in_block && trimmed.starts_with("```") {
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            if lang.is_empty() || lang == "json" {
                in_block = true;
                block_start = offset + line.len();
            }
        } else if in_block && trimmed == "```" {
            let block = response[block_start..offset].trim();
            if block.starts_with('{') {
                return Some(block);
            }
            in_block = false;
        }
        offset += line.len();
    }

    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GradeRequest {
        GradeRequest {
            question_id: "why".into(),
            question: "Why does Rust need ownership?".into(),
            rubric_context: "Rubric: memory safety without GC\n".into(),
            answer: "So memory is freed safely".into(),
            max_points: 20,
        }
    }

    #[test]
    fn prompt_contains_all_parts() {
        let prompt = build_prompt(&request());
        assert!(prompt.contains("Why does Rust need ownership?"));
        assert!(prompt.contains("Rubric: memory safety"));
        assert!(prompt.contains("Maximum points: 20"));
        assert!(prompt.contains("So memory is freed safely"));
    }

    #[test]
    fn parse_bare_json() {
        let verdict = parse_verdict(r#"{"score": 14, "feedback": "Good start"}"#).unwrap();
        assert_eq!(verdict.score, 14.0);
        assert_eq!(verdict.feedback, "Good start");
        assert!(verdict.corrections.is_empty());
    }

    #[test]
    fn parse_fenced_json() {
        let reply = "Here is my grading:\n\n```json\n{\"score\": 7.5, \"feedback\": \"ok\", \"strengths\": [\"concise\"]}\n```\nThanks!";
        let verdict = parse_verdict(reply).unwrap();
        assert_eq!(verdict.score, 7.5);
        assert_eq!(verdict.strengths, vec!["concise".to_string()]);
    }

    #[test]
    fn parse_embedded_json() {
        let reply = "Verdict: {\"score\": 3, \"corrections\": [\"mention borrowing\"]} end";
        let verdict = parse_verdict(reply).unwrap();
        assert_eq!(verdict.score, 3.0);
        assert_eq!(verdict.corrections, vec!["mention borrowing".to_string()]);
    }

    #[test]
    fn reject_replies_without_json() {
        let err = parse_verdict("I think this deserves full marks.").unwrap_err();
        assert!(matches!(err, GraderError::InvalidVerdict(_)));
    }

    #[test]
    fn reject_missing_score() {
        let err = parse_verdict(r#"{"feedback": "no score"}"#).unwrap_err();
        assert!(err.to_string().contains("failed to parse verdict"));
    }
}
