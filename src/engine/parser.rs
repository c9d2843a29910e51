//! Tolerant parsing of LLM replies.
//!
//! The model is told to answer with a bare JSON object but routinely wraps
//! it in commentary or code fences. Parsing is split in two steps so the
//! failure modes stay distinguishable:
//!
//! 1. `extract_json_object` scans for the first balanced `{...}` region.
//! 2. `decode_candidate` strictly decodes that region.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::types::Action;

/// Longest reply excerpt kept in error messages.
const ERROR_EXCERPT_CHARS: usize = 120;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("No JSON object found in LLM response")]
    NoJsonObject,

    #[error("Malformed JSON in LLM response: {0}")]
    InvalidJson(String),

    #[error("LLM response is missing the recommendation field")]
    MissingAction,

    #[error("LLM response has an unrecognised recommendation: {0}")]
    UnknownAction(String),
}

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// A decoded but not yet sanitised recommendation.
///
/// Only the action is guaranteed; every other field is whatever the model
/// sent, if anything.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecommendation {
    pub action: Action,
    pub confidence: Option<f64>,
    pub reasoning: Option<String>,
    pub market_sentiment: Option<String>,
    pub key_insights: Option<Vec<String>>,
    pub risk_level: Option<String>,
}

/// Wire shape, deliberately loose: any JSON object. Each field is looked
/// up under its accepted spellings and the first non-null one wins, so a
/// reply carrying both `recommendation` and `action` still decodes.
type RawRecommendation = Map<String, Value>;

const ACTION_KEYS: &[&str] = &["recommendation", "action"];
const CONFIDENCE_KEYS: &[&str] = &["confidence"];
const REASONING_KEYS: &[&str] = &["reasoning"];
const SENTIMENT_KEYS: &[&str] = &["marketSentiment", "market_sentiment", "sentiment"];
const INSIGHT_KEYS: &[&str] = &["keyInsights", "key_insights", "insights"];
const RISK_KEYS: &[&str] = &["riskLevel", "risk_level", "risk"];

fn field<'a>(raw: &'a RawRecommendation, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| raw.get(*k)).find(|v| !v.is_null())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Extract and decode a recommendation from raw LLM text.
pub fn parse_recommendation(text: &str) -> Result<ParsedRecommendation, ParseError> {
    let candidate = extract_json_object(text).ok_or(ParseError::NoJsonObject)?;
    debug!(chars = candidate.len(), "Found JSON candidate in LLM response");
    decode_candidate(candidate)
}

/// Locate the first balanced, top-level `{...}` region in `text`.
///
/// Braces inside JSON string literals (including escaped quotes) are
/// ignored. Returns `None` when no opening brace is ever closed.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Strictly decode an extracted JSON object into a candidate.
pub fn decode_candidate(json: &str) -> Result<ParsedRecommendation, ParseError> {
    let raw: RawRecommendation = serde_json::from_str(json)
        .map_err(|e| ParseError::InvalidJson(format!("{e} in `{}`", excerpt(json))))?;

    let action_text = field(&raw, ACTION_KEYS)
        .and_then(coerce_text)
        .filter(|a| !a.trim().is_empty())
        .ok_or(ParseError::MissingAction)?;
    let action = action_text
        .parse::<Action>()
        .map_err(|_| ParseError::UnknownAction(action_text.clone()))?;

    Ok(ParsedRecommendation {
        action,
        confidence: field(&raw, CONFIDENCE_KEYS).and_then(coerce_number),
        reasoning: field(&raw, REASONING_KEYS).and_then(coerce_text),
        market_sentiment: field(&raw, SENTIMENT_KEYS).and_then(coerce_text),
        key_insights: field(&raw, INSIGHT_KEYS).and_then(coerce_insights),
        risk_level: field(&raw, RISK_KEYS).and_then(coerce_text),
    })
}

/// Accept numbers and numeric strings ("75", "75%").
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Accept strings and render scalars; ignore null and nested values.
fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accept a list of scalars, or a lone scalar as a one-item list.
fn coerce_insights(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(items.iter().filter_map(coerce_text).collect()),
        other => coerce_text(other).map(|text| vec![text]),
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() > ERROR_EXCERPT_CHARS {
        let cut: String = text.chars().take(ERROR_EXCERPT_CHARS).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
