//! # rubric-core
//!
//! Deterministic grading domain for Rubric.
//!
//! This crate turns the raw text an LLM returns for a grading prompt into a
//! strict, fully-populated [`GradingResult`], answering:
//! - What score did the model assign, clamped to the 1-5 scale?
//! - What should the student do next (upgraded answer, feedback)?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: same input always produces the same output
//! 2. **No LLM calls**: everything here is a pure function; the network
//!    lives in `rubric-runtime`
//! 3. **Never fails on model output**: malformed text degrades to a
//!    fully-defaulted, still-valid result instead of an error
//! 4. **Fully populated**: no field of a returned result is absent or out
//!    of range
//!
//! ## Example
//!
//! ```rust
//! use rubric_core::{build_grading_prompt, interpret_response, GradingRequest};
//!
//! let request = GradingRequest::new(
//!     "Define photosynthesis.",
//!     "The process by which plants convert light into chemical energy.",
//!     "Plants eat sunlight.",
//! );
//!
//! let prompt = build_grading_prompt(&request);
//! // ... send `prompt` to an LLM backend ...
//! let result = interpret_response("```json\n{\"score\": 2}\n```");
//!
//! assert_eq!(result.score, 2);
//! assert_eq!(result.score_label.to_string(), "passing");
//! ```

pub mod normalize;
pub mod prompt;
pub mod repair;
pub mod types;

// Re-export main types and operations at crate root
pub use normalize::{extract_encouragement, normalize};
pub use prompt::{build_grading_prompt, GRADER_SYSTEM_PROMPT, GRADER_SYSTEM_PROMPT_JSON};
pub use repair::parse_llm_json;
pub use types::{
    Encouragement, Feedback, GradingRequest, GradingResult, ScoreLabel, UpgradeAnswer,
};

/// Interpret raw LLM response text as a grading result.
///
/// Composes [`parse_llm_json`] and [`normalize`]: every provider adapter
/// funnels through this so the result invariants hold regardless of which
/// backend produced the text.
pub fn interpret_response(raw: &str) -> GradingResult {
    normalize(&parse_llm_json(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_fenced_response() {
        let result = interpret_response("```json\n{\"score\": 4, \"feedback\": {\"strengths\": [\"concise\"]}}\n```");
        assert_eq!(result.score, 4);
        assert_eq!(result.score_label, ScoreLabel::Good);
        assert_eq!(result.feedback.strengths, vec!["concise"]);
    }

    #[test]
    fn test_interpret_garbage_yields_defaulted_result() {
        let result = interpret_response("I cannot grade this");
        assert_eq!(result.score, 3);
        assert_eq!(result.score_label, ScoreLabel::Average);
        assert_eq!(result.upgrade_answer.target_score, 4);
        assert!(!result.feedback.suggestions.is_empty());
    }
}
