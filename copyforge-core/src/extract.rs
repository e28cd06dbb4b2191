//! Best-effort JSON extraction from free-form model output.
//!
//! Models wrap JSON in fences, prepend chatter, or answer with a bare array.
//! Each strategy is pure and total; the first one that yields valid JSON wins.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value as JsonValue;

use crate::error::PipelineError;

/// Maximum characters of raw output carried in errors and sentinels.
pub const PREVIEW_CHARS: usize = 500;

/// Key marking a parse result that is really an extraction failure.
pub const SENTINEL_ERROR_KEY: &str = "_extraction_error";

/// ```json fenced blocks (language tag case-insensitive)
static JSON_FENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```[ \t]*json[ \t]*\r?\n?(.*?)```").expect("Invalid json fence regex")
});

/// Any fenced block with an optional info string on the opening line
static PLAIN_FENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[^\n`]*\r?\n(.*?)```").expect("Invalid plain fence regex")
});

/// Identifies which extraction strategy produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    JsonFence,
    PlainFence,
    BraceSpan,
    BracketSpan,
    RawText,
}

impl ExtractionStrategy {
    /// Strategies in the order they are attempted
    pub const ORDER: &'static [ExtractionStrategy] = &[
        ExtractionStrategy::JsonFence,
        ExtractionStrategy::PlainFence,
        ExtractionStrategy::BraceSpan,
        ExtractionStrategy::BracketSpan,
        ExtractionStrategy::RawText,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStrategy::JsonFence => "json_fence",
            ExtractionStrategy::PlainFence => "plain_fence",
            ExtractionStrategy::BraceSpan => "brace_span",
            ExtractionStrategy::BracketSpan => "bracket_span",
            ExtractionStrategy::RawText => "raw_text",
        }
    }

    /// Try this strategy alone. Never panics; `None` means "no JSON here".
    pub fn apply(&self, text: &str) -> Option<JsonValue> {
        match self {
            ExtractionStrategy::JsonFence => first_parsable_capture(&JSON_FENCE_REGEX, text),
            ExtractionStrategy::PlainFence => first_parsable_capture(&PLAIN_FENCE_REGEX, text),
            ExtractionStrategy::BraceSpan => widest_span(text, '{', '}'),
            ExtractionStrategy::BracketSpan => widest_span(text, '[', ']'),
            ExtractionStrategy::RawText => parse(text),
        }
    }
}

fn parse(candidate: &str) -> Option<JsonValue> {
    serde_json::from_str(candidate.trim()).ok()
}

fn first_parsable_capture(regex: &Regex, text: &str) -> Option<JsonValue> {
    regex
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .find_map(|m| parse(m.as_str()))
}

/// Parse from the first `open` to the last `close`.
fn widest_span(text: &str, open: char, close: char) -> Option<JsonValue> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    parse(&text[start..=end])
}

/// The first `PREVIEW_CHARS` characters of `text`.
pub fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Extract JSON from model output, reporting which strategy succeeded.
pub fn extract_json_with_strategy(
    text: &str,
) -> Result<(JsonValue, ExtractionStrategy), PipelineError> {
    for strategy in ExtractionStrategy::ORDER {
        if let Some(value) = strategy.apply(text) {
            tracing::debug!(strategy = strategy.as_str(), "Extracted JSON from model output");
            return Ok((value, *strategy));
        }
    }

    Err(PipelineError::ExtractionFailed {
        preview: preview(text),
    })
}

/// Extract JSON from model output.
pub fn extract_json(text: &str) -> Result<JsonValue, PipelineError> {
    extract_json_with_strategy(text).map(|(value, _)| value)
}

/// Extract JSON, or return an error-shaped value that no stage will accept.
///
/// Keeps validation as the single gate deciding whether a stage succeeded.
pub fn parse_or_sentinel(text: &str) -> JsonValue {
    match extract_json(text) {
        Ok(value) => value,
        Err(e) => {
            let mut sentinel = serde_json::Map::new();
            sentinel.insert(SENTINEL_ERROR_KEY.to_string(), JsonValue::String(e.to_string()));
            JsonValue::Object(sentinel)
        }
    }
}

/// The extraction error carried by a sentinel, if `value` is one.
pub fn sentinel_error(value: &JsonValue) -> Option<&str> {
    value.get(SENTINEL_ERROR_KEY).and_then(|v| v.as_str())
}
