//! Critique result and its response schema

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::ai::json::{normalize_score, parse_value, require_fields};
use crate::types::Result;

/// Reviewer's categorical verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CritiqueDecision {
    Accept,
    Revise,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueResult {
    /// 0-100
    pub score: u8,
    pub decision: CritiqueDecision,
    #[serde(default)]
    pub feedback: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
}

pub fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "score": { "type": "integer", "minimum": 0, "maximum": 100 },
            "decision": { "type": "string", "enum": ["accept", "revise", "reject"] },
            "feedback": { "type": "array", "items": { "type": "string" } },
            "strengths": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["score", "decision", "feedback"]
    })
}

pub fn parse_critique(text: &str) -> Result<CritiqueResult> {
    let mut value = parse_value(text, "critique")?;
    require_fields(&value, &["score", "decision"])?;
    normalize_score(&mut value, "score")?;
    Ok(serde_json::from_value(value)?)
}
