//! Response schemas for the structured analysis calls
//!
//! Written in the OpenAPI subset the generation API accepts for
//! `responseSchema`. Field names mirror the serde types in `types::job`.

use serde_json::{Value, json};

fn string_list() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

/// Stage 1: `{ job, cleaned_description }`
pub fn extraction() -> Value {
    json!({
        "type": "object",
        "properties": {
            "job": {
                "type": "object",
                "properties": {
                    "company": { "type": "string" },
                    "title": { "type": "string" },
                    "location": { "type": "string", "nullable": true },
                    "deadline": { "type": "string", "nullable": true },
                    "salary_range": { "type": "string", "nullable": true },
                    "source": { "type": "string", "nullable": true },
                    "required_skills": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": { "type": "string" },
                                "level": {
                                    "type": "string",
                                    "enum": ["beginner", "intermediate", "advanced", "expert"]
                                }
                            },
                            "required": ["name", "level"]
                        }
                    },
                    "skills": string_list(),
                    "responsibilities": string_list()
                },
                "required": ["company", "title", "required_skills", "skills", "responsibilities"]
            },
            "cleaned_description": { "type": "string" }
        },
        "required": ["job", "cleaned_description"]
    })
}

/// Stage 2: fit against the supplied profiles
pub fn fit_analysis() -> Value {
    json!({
        "type": "object",
        "properties": {
            "compatibility_score": { "type": "integer", "minimum": 0, "maximum": 100 },
            "best_profile_id": { "type": "string" },
            "reasoning": { "type": "string" },
            "strengths": string_list(),
            "weaknesses": string_list(),
            "resume_tailoring": { "type": "string" },
            "cover_letter_tailoring": { "type": "string" },
            "recommended_block_ids": string_list()
        },
        "required": ["compatibility_score", "best_profile_id", "reasoning"]
    })
}
