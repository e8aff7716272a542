//! Structured Response Parsing
//!
//! Schema-constrained responses are expected to be JSON, but models still
//! occasionally wrap them in markdown code fences. Everything here operates on
//! the raw response text.

use serde_json::Value;
use tracing::debug;

use crate::types::{Result, ValidationError, ValidationErrorKind};

/// Strip markdown code fences (```json ... ``` or ``` ... ```)
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim().trim_start_matches('\u{feff}');

    if s.starts_with("```") {
        s = match s.find('\n') {
            Some(first_newline) => &s[first_newline + 1..],
            None => s.trim_start_matches('`'),
        };
    }

    if let Some(stripped) = s.trim_end().strip_suffix("```") {
        s = stripped;
    }

    s.trim()
}

/// Parse a structured response into a JSON value.
///
/// Empty text is a validation error; malformed JSON is a parse error.
pub fn parse_value(raw: &str, context: &str) -> Result<Value> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(ValidationError::empty_response(context).into());
    }

    let value = serde_json::from_str::<Value>(cleaned)?;
    debug!(context, "Parsed structured response");
    Ok(value)
}

/// Fail unless every named top-level field is present and non-null
pub fn require_fields(value: &Value, fields: &[&str]) -> Result<()> {
    for field in fields {
        match value.get(*field) {
            None | Some(Value::Null) => return Err(ValidationError::missing_field(field).into()),
            Some(_) => {}
        }
    }
    Ok(())
}

/// Round a 0-100 score field in place, clamping out-of-range values.
///
/// Non-numeric scores are a validation error.
pub fn normalize_score(value: &mut Value, field: &str) -> Result<u8> {
    let raw = value.get(field).and_then(Value::as_f64).ok_or_else(|| {
        ValidationError::new(ValidationErrorKind::Range, "score is not a number").with_field(field)
    })?;

    let score = raw.round().clamp(0.0, 100.0) as u8;
    if let Some(slot) = value.get_mut(field) {
        *slot = Value::from(score);
    }
    Ok(score)
}
