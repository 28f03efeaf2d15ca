//! Core types for grading requests and results.
//!
//! `GradingResult` is the only structural contract this crate exports to the
//! surrounding system: persistence and UI consume its serialized form, so the
//! wire field names are camelCase and every field of a returned result is
//! populated. `encouragement` is the one exception, a provider-specific
//! extension that some adapters guarantee and others omit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A request to grade one student answer against a reference answer.
///
/// Constructed per call and consumed within it; this subsystem never
/// persists requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingRequest {
    /// The question as shown to the student.
    pub question_text: String,

    /// The reference answer the student is graded against.
    pub reference_answer: String,

    /// The student's free-text answer.
    pub student_answer: String,

    /// Optional scoring rubric supplied by the question author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring_criteria: Option<String>,

    /// The student's current score on this question, if re-grading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_score: Option<u8>,
}

impl GradingRequest {
    /// Create a request from the three required texts.
    pub fn new(
        question_text: impl Into<String>,
        reference_answer: impl Into<String>,
        student_answer: impl Into<String>,
    ) -> Self {
        Self {
            question_text: question_text.into(),
            reference_answer: reference_answer.into(),
            student_answer: student_answer.into(),
            scoring_criteria: None,
            current_score: None,
        }
    }

    /// Attach a scoring rubric.
    pub fn with_scoring_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.scoring_criteria = Some(criteria.into());
        self
    }

    /// Attach the student's current score.
    pub fn with_current_score(mut self, score: u8) -> Self {
        self.current_score = Some(score);
        self
    }
}

/// Human-readable band for a 1-5 score.
///
/// Always derived from the clamped score via [`ScoreLabel::from_score`];
/// a label supplied by the LLM is never trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreLabel {
    #[serde(rename = "needs improvement")]
    NeedsImprovement,
    #[serde(rename = "passing")]
    Passing,
    #[serde(rename = "average")]
    Average,
    #[serde(rename = "good")]
    Good,
    #[serde(rename = "excellent")]
    Excellent,
}

impl ScoreLabel {
    /// Look up the label for a score.
    ///
    /// Scores outside the 1-5 table fall back to [`ScoreLabel::Average`];
    /// callers clamp before looking up, so the fallback is unreachable in
    /// practice.
    pub fn from_score(score: u8) -> Self {
        match score {
            1 => ScoreLabel::NeedsImprovement,
            2 => ScoreLabel::Passing,
            3 => ScoreLabel::Average,
            4 => ScoreLabel::Good,
            5 => ScoreLabel::Excellent,
            _ => ScoreLabel::Average,
        }
    }

    /// The wire string for this label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreLabel::NeedsImprovement => "needs improvement",
            ScoreLabel::Passing => "passing",
            ScoreLabel::Average => "average",
            ScoreLabel::Good => "good",
            ScoreLabel::Excellent => "excellent",
        }
    }
}

impl fmt::Display for ScoreLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A model-generated exemplar answer one score band above the student's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeAnswer {
    /// The score band the template aims for, `min(5, score + 1)` by default.
    pub target_score: u8,

    /// Free-text template the student can build on.
    pub template_answer: String,

    /// Concrete scoring points the template hits.
    pub key_points: Vec<String>,
}

/// Structured feedback on the student answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Motivational copy attached by some providers.
///
/// Provider-specific extension, not a core invariant: adapters that promise
/// it fill in [`Encouragement::placeholder`] when the model omits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encouragement {
    pub message: String,
    pub tip: String,
    pub progress: String,
}

impl Encouragement {
    /// The fully-defaulted variant used when the model supplies nothing.
    pub fn placeholder() -> Self {
        Self {
            message: "Keep up the effort!".to_string(),
            tip: "Practice makes perfect.".to_string(),
            progress: "You are making progress.".to_string(),
        }
    }
}

/// The normalized, fully-populated output of a grading call.
///
/// Invariant: no field is ever absent or out of range, regardless of how
/// malformed the upstream LLM response was. `score` is always within 1-5
/// and `score_label` always matches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    /// Integer score, clamped to the closed interval [1, 5].
    pub score: u8,

    /// Label recomputed from `score` via the fixed table.
    pub score_label: ScoreLabel,

    /// Template for reaching the next score band.
    pub upgrade_answer: UpgradeAnswer,

    /// Strengths, weaknesses, and suggestions, each independently defaulted.
    pub feedback: Feedback,

    /// Provider-specific extension; see [`Encouragement`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encouragement: Option<Encouragement>,
}
