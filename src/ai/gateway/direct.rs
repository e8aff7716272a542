//! Direct Invoker
//!
//! Calls the LLM service's `generateContent` endpoint with the caller's own
//! API key. HTTP failures are classified by status code, never by message.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use super::Invoker;
use crate::ai::model::{Content, GenerationConfig, InvocationResponse, ModelId, UsageMetadata};
use crate::types::{
    ErrorCategory, ErrorClassifier, InvocationPath, LlmError, Result, ValidationError,
};

pub struct DirectInvoker {
    /// Stored securely - never exposed in logs or debug output
    api_key: SecretString,
    endpoint: String,
    model: ModelId,
    config: GenerationConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for DirectInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectInvoker")
            .field("api_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl DirectInvoker {
    pub fn new(
        client: reqwest::Client,
        api_base: &str,
        api_key: SecretString,
        model: ModelId,
        config: GenerationConfig,
    ) -> Self {
        Self {
            api_key,
            endpoint: format!(
                "{}/models/{}:generateContent",
                api_base.trim_end_matches('/'),
                model.as_str()
            ),
            model,
            config,
            client,
        }
    }

    fn error(category: ErrorCategory, message: impl Into<String>) -> LlmError {
        LlmError::new(category, message).via(InvocationPath::Direct)
    }
}

#[async_trait]
impl Invoker for DirectInvoker {
    async fn generate_content(&self, contents: &[Content]) -> Result<InvocationResponse> {
        let start = Instant::now();
        let body = GenerateContentRequest {
            contents,
            generation_config: &self.config,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::error(ErrorCategory::Network, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let category = ErrorClassifier::classify_http_status(status.as_u16(), &body);
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(
                Self::error(category, format!("HTTP {}: {}", status.as_u16(), message)).into(),
            );
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            Self::error(
                ErrorCategory::Network,
                format!("Failed to read response body: {}", e),
            )
        })?;

        debug!(
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generateContent completed"
        );

        parsed.into_response()
    }

    fn path(&self) -> InvocationPath {
        InvocationPath::Direct
    }

    fn model(&self) -> ModelId {
        self.model
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [Content],
    generation_config: &'a GenerationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

/// Response parts may carry fields beyond `text`; only text is kept
#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl GenerateContentResponse {
    fn into_response(self) -> Result<InvocationResponse> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(DirectInvoker::error(
                ErrorCategory::BadRequest,
                format!("Prompt blocked: {}", reason),
            )
            .into());
        }

        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ValidationError::empty_response("generateContent").into());
        }

        Ok(InvocationResponse {
            text,
            usage: self.usage_metadata,
        })
    }
}
