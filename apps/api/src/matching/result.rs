//! Validation boundary for model output.
//!
//! Whatever the model returns, a `MatchResult` always holds a percent in `0..=100`
//! and a summary of 1 to 900 characters. Construction only happens here.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::llm_client::LlmError;
use crate::vacancy::normalize::truncate_chars;

pub const MAX_SUMMARY_CHARS: usize = 900;
/// Stands in for an empty summary.
pub const EMPTY_SUMMARY: &str = "—";

lazy_static! {
    // greedy: first `{` to last `}`
    static ref JSON_OBJECT: Regex = Regex::new(r"(?s)\{.*\}").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    percent: u8,
    summary: String,
}

impl MatchResult {
    /// Parses the model's reply text and clamps both fields.
    pub fn from_reply(reply: &str) -> Result<Self, LlmError> {
        let object = parse_reply(reply).ok_or_else(|| {
            LlmError::Parse(format!(
                "no JSON object in reply: {}",
                truncate_chars(reply.trim(), 200)
            ))
        })?;

        Ok(Self::from_fields(object.get("percent"), object.get("summary")))
    }

    pub fn from_fields(percent: Option<&Value>, summary: Option<&Value>) -> Self {
        Self {
            percent: clamp_percent(percent),
            summary: sanitize_summary(summary),
        }
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }
}

/// Strict parse first (after stripping markdown fences), then greedy `{...}` recovery.
pub fn parse_reply(reply: &str) -> Option<Map<String, Value>> {
    if let Ok(Value::Object(object)) = serde_json::from_str(strip_json_fences(reply)) {
        return Some(object);
    }

    let candidate = JSON_OBJECT.find(reply)?;
    match serde_json::from_str(candidate.as_str()) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Coerces a loosely typed percent to a number and clamps it.
pub fn clamp_percent(value: Option<&Value>) -> u8 {
    let number = match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) if s.trim().is_empty() => 0.0,
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        Some(_) => f64::NAN,
    };
    clamp_percent_f64(number)
}

/// Non-finite becomes 0; everything else is rounded and clamped to `0..=100`.
pub fn clamp_percent_f64(number: f64) -> u8 {
    if !number.is_finite() {
        return 0;
    }
    number.round().clamp(0.0, 100.0) as u8
}

/// Trims and caps the summary; an empty result becomes [`EMPTY_SUMMARY`].
pub fn sanitize_summary(value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => String::new(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(true)) => "true".to_string(),
        Some(composite) => composite.to_string(),
    };
    sanitize_summary_str(&text)
}

pub fn sanitize_summary_str(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return EMPTY_SUMMARY.to_string();
    }
    truncate_chars(trimmed, MAX_SUMMARY_CHARS).to_string()
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
