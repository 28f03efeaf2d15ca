//! Layered repair of malformed LLM responses.
//!
//! The model is adversarial from the parser's point of view: the prompt's
//! formatting rules are a strong hint, not a guarantee. Replies arrive
//! wrapped in markdown fences, quoted with typographic punctuation, salted
//! with zero-width characters or pictographs, or buried in surrounding
//! prose. Each cleanup stage below is applied cumulatively, with a parse
//! attempt after every stage, until one succeeds.
//!
//! Total failure returns an empty object rather than an error. The caller
//! is serving a student who is waiting for a grade; a fully-defaulted
//! result is more useful there than a failed request, so the trade is
//! availability over silent data loss, and the loss is logged.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    /// Opening fence line, with or without a language tag.
    static ref OPENING_FENCE: Regex = Regex::new(r"^```(?:json)?\s*\n?").unwrap();

    /// Closing fence line.
    static ref CLOSING_FENCE: Regex = Regex::new(r"\n?```\s*$").unwrap();
}

/// Parse raw LLM output into JSON, repairing common damage.
///
/// Never fails: when every repair stage is exhausted the original text is
/// logged and an empty object is returned, which the normalizer turns into
/// a fully-defaulted, still-valid result.
pub fn parse_llm_json(raw: &str) -> Value {
    let mut clean = raw.trim().to_string();

    // Stage 1: strip a markdown code fence.
    if clean.starts_with("```") {
        clean = OPENING_FENCE.replace(&clean, "").into_owned();
        clean = CLOSING_FENCE.replace(&clean, "").into_owned();
        clean = clean.trim().to_string();
    }

    // Stage 2: typographic quotes break strict JSON more often than any
    // other single defect, so normalize them unconditionally.
    clean = normalize_quotes(&clean);

    if let Some(value) = try_parse(&clean) {
        return value;
    }
    tracing::warn!("direct JSON parse failed, stripping invisible characters");

    // Stage 3: BOM and zero-width characters.
    let visible = strip_invisible(&clean);
    if let Some(value) = try_parse(&visible) {
        return value;
    }
    tracing::warn!("JSON parse failed again, stripping pictographs");

    // Stage 4: emoji blocks that corrupt escaping mid-string.
    let plain = strip_pictographs(&visible);
    if let Some(value) = try_parse(&plain) {
        return value;
    }
    tracing::warn!("JSON parse failed again, extracting outer braces");

    // Stage 5: greedy outer-brace match for JSON buried in prose.
    if let Some(candidate) = extract_braced(&plain) {
        if let Some(value) = try_parse(candidate) {
            return value;
        }
    }

    tracing::error!(
        raw_len = raw.len(),
        clean_len = clean.len(),
        raw = %raw,
        clean = %clean,
        "all JSON repair stages exhausted, returning empty object"
    );
    Value::Object(serde_json::Map::new())
}

fn try_parse(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Replace typographic double and single quotation marks with ASCII.
fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            c => c,
        })
        .collect()
}

/// Drop a leading byte-order mark and all zero-width characters.
fn strip_invisible(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\u{200B}'..='\u{200D}' | '\u{FEFF}'))
        .collect()
}

/// Drop the pictographic Unicode blocks models sprinkle into feedback.
fn strip_pictographs(text: &str) -> String {
    text.chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{1F300}'..='\u{1F9FF}' | '\u{2600}'..='\u{26FF}' | '\u{2700}'..='\u{27BF}'
            )
        })
        .collect()
}

/// The substring between the first `{` and the last `}`, if any.
fn extract_braced(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
