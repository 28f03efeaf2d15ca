//! Normalization of parsed LLM output into a strict [`GradingResult`].
//!
//! The parsed value may be incomplete, mistyped, or empty. Every field is
//! decoded independently with its own default, so one bad field never
//! discards its siblings: `feedback.strengths` survives even when
//! `feedback.weaknesses` is missing. The returned result is always fully
//! populated and in range.

use serde_json::Value;

use crate::types::{Encouragement, Feedback, GradingResult, ScoreLabel, UpgradeAnswer};

/// Score assumed when the model supplied none, or nothing numeric.
pub const DEFAULT_SCORE: u8 = 3;

/// Placeholder template when the model produced no upgraded answer.
pub const TEMPLATE_ANSWER_PLACEHOLDER: &str = "No upgraded answer template is available yet.";

/// Placeholder entry for missing strengths or weaknesses.
pub const FEEDBACK_PLACEHOLDER: &str = "No feedback available yet.";

/// Placeholder entry for missing suggestions.
pub const SUGGESTION_PLACEHOLDER: &str = "No suggestions available yet.";

/// Coerce a parsed response into a fully-populated grading result.
///
/// Never fails. The score is clamped to [1, 5] (defaulting to
/// [`DEFAULT_SCORE`], rounding floats to the nearest integer) and the label
/// is recomputed from the clamped score; a label in the input is discarded.
/// Feeding a serialized [`GradingResult`] back through this function
/// returns an equal result.
pub fn normalize(raw: &Value) -> GradingResult {
    let score = clamp_score(raw.get("score"));
    let upgrade = raw.get("upgradeAnswer");
    let feedback = raw.get("feedback");

    GradingResult {
        score,
        score_label: ScoreLabel::from_score(score),
        upgrade_answer: UpgradeAnswer {
            target_score: u8_field(upgrade, "targetScore").unwrap_or_else(|| next_band(score)),
            template_answer: str_field(upgrade, "templateAnswer")
                .unwrap_or_else(|| TEMPLATE_ANSWER_PLACEHOLDER.to_string()),
            key_points: str_list(upgrade, "keyPoints").unwrap_or_default(),
        },
        feedback: Feedback {
            strengths: str_list(feedback, "strengths")
                .unwrap_or_else(|| vec![FEEDBACK_PLACEHOLDER.to_string()]),
            weaknesses: str_list(feedback, "weaknesses")
                .unwrap_or_else(|| vec![FEEDBACK_PLACEHOLDER.to_string()]),
            suggestions: str_list(feedback, "suggestions")
                .unwrap_or_else(|| vec![SUGGESTION_PLACEHOLDER.to_string()]),
        },
        encouragement: extract_encouragement(raw),
    }
}

/// Pull the optional encouragement extension out of a parsed response.
///
/// Returns `None` when the field is absent or not an object; inside a
/// present object each field defaults independently. Adapters that promise
/// the extension call [`Encouragement::placeholder`] on `None`.
pub fn extract_encouragement(raw: &Value) -> Option<Encouragement> {
    let obj = raw.get("encouragement")?;
    if !obj.is_object() {
        return None;
    }

    let placeholder = Encouragement::placeholder();
    Some(Encouragement {
        message: str_field(Some(obj), "message").unwrap_or(placeholder.message),
        tip: str_field(Some(obj), "tip").unwrap_or(placeholder.tip),
        progress: str_field(Some(obj), "progress").unwrap_or(placeholder.progress),
    })
}

/// The score band one above the given score, capped at 5.
fn next_band(score: u8) -> u8 {
    (score + 1).min(5)
}

/// Extract and clamp the score: numeric values (floats rounded) clamp to
/// [1, 5]; anything else becomes [`DEFAULT_SCORE`].
fn clamp_score(value: Option<&Value>) -> u8 {
    let n = match value.and_then(Value::as_f64) {
        Some(n) if n.is_finite() => n.round(),
        _ => f64::from(DEFAULT_SCORE),
    };
    n.clamp(1.0, 5.0) as u8
}

fn u8_field(obj: Option<&Value>, key: &str) -> Option<u8> {
    obj?.get(key)?
        .as_f64()
        .filter(|n| n.is_finite())
        .map(|n| n.round() as u8)
}

fn str_field(obj: Option<&Value>, key: &str) -> Option<String> {
    obj?.get(key)?.as_str().map(str::to_string)
}

/// Decode a list of strings, silently dropping non-string elements.
/// `None` when the field is absent or not a list.
fn str_list(obj: Option<&Value>, key: &str) -> Option<Vec<String>> {
    let items = obj?.get(key)?.as_array()?;
    Some(items.iter().filter_map(Value::as_str).map(str::to_string).collect())
}
