//! Invocation Data Model
//!
//! Request/response shapes shared by both invocation paths. Serialized field
//! names follow the LLM service wire format (camelCase), so the same values
//! can be forwarded verbatim through the relay.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Models
// =============================================================================

/// Known models. Unknown names fail to deserialize instead of falling through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelId {
    /// Cheapest tier, used for extraction
    #[serde(rename = "gemini-2.5-flash-lite")]
    FlashLite,
    /// Balanced tier, used for generation and critique
    #[serde(rename = "gemini-2.5-flash")]
    Flash,
    /// Highest quality tier, used for fit comparison
    #[serde(rename = "gemini-2.5-pro")]
    Pro,
}

impl ModelId {
    pub const ALL: [ModelId; 3] = [Self::FlashLite, Self::Flash, Self::Pro];

    /// Wire name of the model
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlashLite => "gemini-2.5-flash-lite",
            Self::Flash => "gemini-2.5-flash",
            Self::Pro => "gemini-2.5-pro",
        }
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Unknown model: {}. Supported: gemini-2.5-flash-lite, gemini-2.5-flash, gemini-2.5-pro",
                    s
                )
            })
    }
}

// =============================================================================
// Request
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Model,
}

/// One piece of prompt content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Part {
    Text(String),
    /// Binary payload, base64-encoded
    InlineData { mime_type: String, data: String },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn inline(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::InlineData {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::InlineData { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    /// Single text part from the user
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenated text parts, used for logging
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Sampling and output-shape parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

impl GenerationConfig {
    /// Strict JSON output conforming to `schema`
    pub fn structured(schema: Value) -> Self {
        Self {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(schema),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    pub fn is_structured(&self) -> bool {
        self.response_schema.is_some()
    }
}

/// Immutable per-call request
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub model: ModelId,
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl InvocationRequest {
    pub fn new(model: ModelId, prompt: impl Into<String>, config: GenerationConfig) -> Self {
        Self {
            model,
            contents: vec![Content::user_text(prompt)],
            generation_config: config,
        }
    }

    /// All prompt text, used for logging
    pub fn prompt_text(&self) -> String {
        self.contents
            .iter()
            .map(Content::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// =============================================================================
// Response
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageMetadata {
    pub prompt_token_count: u32,
    pub candidates_token_count: u32,
    pub total_token_count: u32,
}

impl UsageMetadata {
    /// Total, falling back to prompt + candidates when the service omits it
    pub fn total(&self) -> u32 {
        if self.total_token_count > 0 {
            self.total_token_count
        } else {
            self.prompt_token_count + self.candidates_token_count
        }
    }
}

/// Path-agnostic invocation result
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResponse {
    pub text: String,
    pub usage: Option<UsageMetadata>,
}

impl InvocationResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: UsageMetadata) -> Self {
        self.usage = Some(usage);
        self
    }
}
