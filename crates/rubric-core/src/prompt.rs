//! Grading prompts.
//!
//! The user prompt embeds a strict-JSON output template so that the model's
//! reply can be decoded directly in the common case. The formatting rules in
//! the prompt are a strong hint, not a guarantee; [`crate::repair`] handles
//! the replies that ignore them.

use crate::types::GradingRequest;

/// System prompt establishing the grader persona.
pub const GRADER_SYSTEM_PROMPT: &str = "You are a professional educational \
assessment expert who grades subjective answers on a 5-point scale. Your \
feedback is encouraging, concrete, and practical.";

/// Variant for backends that benefit from an explicit JSON reminder in the
/// system turn.
pub const GRADER_SYSTEM_PROMPT_JSON: &str = "You are a professional \
educational assessment expert who grades subjective answers on a 5-point \
scale. Your feedback is encouraging, concrete, and practical. Always respond \
with valid JSON.";

/// Render a grading request into a single instruction string.
///
/// Deterministic pure templating: the same request always produces the same
/// prompt, and there are no error conditions. A missing scoring rubric
/// renders as an empty section.
pub fn build_grading_prompt(request: &GradingRequest) -> String {
    let scoring_criteria = request.scoring_criteria.as_deref().unwrap_or("");

    format!(
        r#"As a professional educational assessment expert, grade the student answer on a 5-point scale and produce study guidance.

**Question:**
{question}

**Reference answer:**
{reference}

**Scoring rubric:**
{criteria}

**Student answer:**
{answer}

---

**Task requirements:**
1. Assign an integer score from 1 to 5
2. Produce an upgraded answer template (target: current score + 1, with 3-5 key scoring points)
3. Detailed feedback: exactly 1 strength, at least 2 weaknesses, at least 3 study suggestions

---

**Output format:**
Reply with a single ```json code block and follow these rules exactly:
- Use ASCII double quotes only; never typographic quotation marks
- Escape newlines inside strings as \n
- Make sure the JSON is completely closed

```json
{{
  "score": 3,
  "scoreLabel": "average",
  "upgradeAnswer": {{
    "targetScore": 4,
    "templateAnswer": "To lift this answer into the next score band, build on it along these lines: ...",
    "keyPoints": ["key point 1", "key point 2", "key point 3"]
  }},
  "feedback": {{
    "strengths": ["strength"],
    "weaknesses": ["weakness 1", "weakness 2"],
    "suggestions": ["suggestion 1", "suggestion 2", "suggestion 3"]
  }}
}}
```"#,
        question = request.question_text,
        reference = request.reference_answer,
        criteria = scoring_criteria,
        answer = request.student_answer,
    )
}
