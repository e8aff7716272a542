//! Relay Invoker
//!
//! Forwards each call as one opaque request to the backend relay, which holds
//! the shared credentials. The relay answers `{text, usage?}` on success or
//! `{error, code?}` on application failure; transport faults are reported
//! separately. Both failure shapes become an [`LlmError`] so the retry
//! executor sees the same categories on either path.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::Invoker;
use crate::ai::model::{Content, GenerationConfig, InvocationResponse, ModelId, UsageMetadata};
use crate::ai::session::SessionProvider;
use crate::types::{
    ErrorCategory, ErrorClassifier, InvocationPath, LlmError, Result, ValidationError,
};

/// Body sent to the relay
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    pub payload: RelayPayload,
    pub model_name: ModelId,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelayPayload {
    pub contents: Vec<Content>,
}

/// Relay response; exactly one of `text` or `error` is expected
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayReply {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub usage: Option<UsageMetadata>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl RelayReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// `Err` is a transport-level fault; application errors arrive inside `Ok`
pub type RelayTransportResult = std::result::Result<RelayReply, LlmError>;

#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn call(&self, request: RelayRequest) -> RelayTransportResult;
}

// =============================================================================
// Invoker
// =============================================================================

pub struct RelayInvoker {
    transport: Arc<dyn RelayTransport>,
    model: ModelId,
    config: GenerationConfig,
}

impl RelayInvoker {
    pub fn new(
        transport: Arc<dyn RelayTransport>,
        model: ModelId,
        config: GenerationConfig,
    ) -> Self {
        Self {
            transport,
            model,
            config,
        }
    }
}

#[async_trait]
impl Invoker for RelayInvoker {
    async fn generate_content(&self, contents: &[Content]) -> Result<InvocationResponse> {
        let request = RelayRequest {
            payload: RelayPayload {
                contents: contents.to_vec(),
            },
            model_name: self.model,
            generation_config: self.config.clone(),
        };

        let reply = self
            .transport
            .call(request)
            .await
            .map_err(|e| e.via(InvocationPath::Relay))?;

        if let Some(message) = reply.error {
            return Err(relay_error(&message, reply.code.as_deref()).into());
        }

        let text = reply.text.unwrap_or_default();
        if text.is_empty() {
            return Err(ValidationError::empty_response("Relay").into());
        }

        debug!(model = %self.model, "Relay call completed");
        Ok(InvocationResponse {
            text,
            usage: reply.usage,
        })
    }

    fn path(&self) -> InvocationPath {
        InvocationPath::Relay
    }

    fn model(&self) -> ModelId {
        self.model
    }
}

/// Map a relay application error onto a category, once.
///
/// An explicit code is refined by the message the same way an HTTP status is
/// on the direct path; without a code the message is classified. Anything
/// still unknown is attributed to the relay itself.
fn relay_error(message: &str, code: Option<&str>) -> LlmError {
    let category = match code.and_then(ErrorCategory::from_code) {
        Some(category) => ErrorClassifier::refine(category, message),
        None => match ErrorClassifier::classify(message) {
            ErrorCategory::Unknown => ErrorCategory::Relay,
            other => other,
        },
    };
    LlmError::new(category, message).via(InvocationPath::Relay)
}

// =============================================================================
// HTTP transport
// =============================================================================

pub struct HttpRelayTransport {
    client: reqwest::Client,
    url: String,
    session: Arc<dyn SessionProvider>,
}

impl HttpRelayTransport {
    pub fn new(client: reqwest::Client, url: String, session: Arc<dyn SessionProvider>) -> Self {
        Self {
            client,
            url,
            session,
        }
    }
}

#[async_trait]
impl RelayTransport for HttpRelayTransport {
    async fn call(&self, request: RelayRequest) -> RelayTransportResult {
        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(token) = self.session.access_token() {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder.send().await.map_err(|e| {
            LlmError::new(ErrorCategory::Relay, format!("Relay request failed: {}", e))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            LlmError::new(
                ErrorCategory::Relay,
                format!("Failed to read relay response: {}", e),
            )
        })?;

        if status.is_success() {
            return serde_json::from_str::<RelayReply>(&body).map_err(|e| {
                LlmError::new(
                    ErrorCategory::Relay,
                    format!("Malformed relay response: {}", e),
                )
            });
        }

        // Non-2xx bodies usually still carry {error, code}
        if let Ok(reply) = serde_json::from_str::<RelayReply>(&body)
            && reply.error.is_some()
        {
            return Ok(reply);
        }

        let category = match ErrorClassifier::classify_http_status(status.as_u16(), &body) {
            ErrorCategory::Unknown => ErrorCategory::Relay,
            other => other,
        };
        Err(LlmError::new(
            category,
            format!("Relay returned HTTP {}: {}", status.as_u16(), body),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::session::{AnonymousSession, StaticSession};
    use crate::types::JobfitError;
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Replays canned results and records each request
    struct ScriptedTransport {
        replies: Mutex<Vec<RelayTransportResult>>,
        seen: Mutex<Vec<RelayRequest>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<RelayTransportResult>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RelayTransport for ScriptedTransport {
        async fn call(&self, request: RelayRequest) -> RelayTransportResult {
            self.seen.lock().unwrap().push(request);
            self.replies.lock().unwrap().remove(0)
        }
    }

    fn category_of(err: JobfitError) -> (ErrorCategory, Option<InvocationPath>) {
        match err {
            JobfitError::Llm(e) => (e.category, e.path),
            other => (other.category(), None),
        }
    }

    async fn invoke(reply: RelayTransportResult) -> Result<InvocationResponse> {
        let transport = ScriptedTransport::new(vec![reply]);
        RelayInvoker::new(transport, ModelId::Pro, GenerationConfig::default())
            .generate_content(&[Content::user_text("hi")])
            .await
    }

    #[tokio::test]
    async fn test_success_is_unwrapped() {
        let usage = UsageMetadata {
            prompt_token_count: 3,
            candidates_token_count: 2,
            total_token_count: 5,
        };
        let mut reply = RelayReply::text("hello");
        reply.usage = Some(usage);

        let response = invoke(Ok(reply)).await.unwrap();
        assert_eq!(response.text, "hello");
        assert_eq!(response.usage, Some(usage));
    }

    #[tokio::test]
    async fn test_request_carries_model_and_config() {
        let transport = ScriptedTransport::new(vec![Ok(RelayReply::text("ok"))]);
        let config = GenerationConfig::default().with_temperature(0.3);
        RelayInvoker::new(transport.clone(), ModelId::FlashLite, config.clone())
            .generate_content(&[Content::user_text("extract this")])
            .await
            .unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].model_name, ModelId::FlashLite);
        assert_eq!(seen[0].generation_config, config);
        assert_eq!(seen[0].payload.contents[0].text(), "extract this");
    }

    #[tokio::test]
    async fn test_application_error_with_code() {
        let err = invoke(Ok(RelayReply::error("slow down").with_code("RESOURCE_EXHAUSTED")))
            .await
            .unwrap_err();
        assert_eq!(
            category_of(err),
            (ErrorCategory::RateLimit, Some(InvocationPath::Relay))
        );
    }

    #[tokio::test]
    async fn test_application_error_without_code_is_classified_once() {
        let err = invoke(Ok(RelayReply::error(
            "Quota exceeded for GenerateRequestsPerDayPerProjectPerModel",
        )))
        .await
        .unwrap_err();
        assert_eq!(category_of(err).0, ErrorCategory::DailyQuota);

        let err = invoke(Ok(RelayReply::error("internal relay failure")))
            .await
            .unwrap_err();
        assert_eq!(category_of(err).0, ErrorCategory::Relay);
    }

    #[tokio::test]
    async fn test_per_day_message_overrides_rate_limit_code() {
        let err = invoke(Ok(RelayReply::error(
            "Quota exceeded for metric: generate_content_free_tier_requests, limit: GenerateRequestsPerDayPerProjectPerModel-FreeTier",
        )
        .with_code("RESOURCE_EXHAUSTED")))
        .await
        .unwrap_err();
        assert_eq!(
            category_of(err),
            (ErrorCategory::DailyQuota, Some(InvocationPath::Relay))
        );
    }

    #[tokio::test]
    async fn test_overload_is_rate_limit_with_or_without_code() {
        let message = "The model is overloaded. Please try again later.";

        let err = invoke(Ok(RelayReply::error(message).with_code("UNAVAILABLE")))
            .await
            .unwrap_err();
        assert_eq!(category_of(err).0, ErrorCategory::RateLimit);

        let err = invoke(Ok(RelayReply::error(message))).await.unwrap_err();
        assert_eq!(category_of(err).0, ErrorCategory::RateLimit);
    }

    #[tokio::test(start_paused = true)]
    async fn test_daily_quota_over_relay_fails_fast() {
        use crate::ai::client::LlmClient;
        use crate::ai::gateway::{ModelGateway, NoCredentials};
        use crate::ai::model::InvocationRequest;
        use crate::ai::retry::{CallOptions, InvocationContext, RetryExecutor, RetryPolicy};
        use crate::ai::telemetry::{EventType, TelemetryLogger};
        use crate::config::GatewayConfig;
        use crate::types::DAILY_QUOTA_MESSAGE;
        use std::time::Duration;

        let per_day = || {
            Ok(RelayReply::error(
                "Quota exceeded, limit: GenerateRequestsPerDayPerProjectPerModel-FreeTier",
            )
            .with_code("RESOURCE_EXHAUSTED"))
        };
        let transport = ScriptedTransport::new(vec![per_day(), per_day(), per_day()]);
        let gateway = ModelGateway::new(
            &GatewayConfig::default(),
            Duration::from_secs(5),
            Arc::new(NoCredentials),
            Some(transport.clone()),
        )
        .unwrap();
        let client = LlmClient::new(
            Arc::new(gateway),
            Arc::new(RetryExecutor::new(
                Arc::new(TelemetryLogger::disabled()),
                Duration::from_secs(30),
            )),
            RetryPolicy::new(3, Duration::from_secs(2)),
        );

        let start = tokio::time::Instant::now();
        let err = client
            .generate_text(
                &InvocationRequest::new(ModelId::Flash, "hi", GenerationConfig::default()),
                InvocationContext::new(EventType::Generation, ModelId::Flash, "hi"),
                &CallOptions::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, JobfitError::DailyQuotaExceeded));
        assert_eq!(err.to_string(), DAILY_QUOTA_MESSAGE);
        assert_eq!(transport.seen.lock().unwrap().len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_transport_fault_is_tagged_relay() {
        let err = invoke(Err(LlmError::new(ErrorCategory::Relay, "connection reset")))
            .await
            .unwrap_err();
        assert_eq!(
            category_of(err),
            (ErrorCategory::Relay, Some(InvocationPath::Relay))
        );
    }

    #[tokio::test]
    async fn test_empty_text_is_validation_error() {
        let err = invoke(Ok(RelayReply::default())).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[tokio::test]
    async fn test_http_transport_wire_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer session-token"))
            .and(body_partial_json(json!({
                "modelName": "gemini-2.5-flash",
                "payload": {"contents": [{"role": "user", "parts": [{"text": "hi"}]}]},
                "generationConfig": {"temperature": 0.7}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "relayed"})))
            .expect(1)
            .mount(&server)
            .await;

        let session = Arc::new(StaticSession::new("u1").with_access_token("session-token"));
        let transport = Arc::new(HttpRelayTransport::new(
            reqwest::Client::new(),
            server.uri(),
            session,
        ));
        let response = RelayInvoker::new(
            transport,
            ModelId::Flash,
            GenerationConfig::default().with_temperature(0.7),
        )
        .generate_content(&[Content::user_text("hi")])
        .await
        .unwrap();
        assert_eq!(response.text, "relayed");
    }

    #[tokio::test]
    async fn test_http_transport_error_body_on_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(json!({"error": "Daily limit reached", "code": "daily_quota"})),
            )
            .mount(&server)
            .await;

        let transport = Arc::new(HttpRelayTransport::new(
            reqwest::Client::new(),
            server.uri(),
            Arc::new(AnonymousSession),
        ));
        let err = RelayInvoker::new(transport, ModelId::Flash, GenerationConfig::default())
            .generate_content(&[Content::user_text("hi")])
            .await
            .unwrap_err();
        assert_eq!(category_of(err).0, ErrorCategory::DailyQuota);
    }

    #[tokio::test]
    async fn test_http_transport_bare_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let transport = HttpRelayTransport::new(
            reqwest::Client::new(),
            server.uri(),
            Arc::new(AnonymousSession),
        );
        let request = RelayRequest {
            payload: RelayPayload { contents: vec![] },
            model_name: ModelId::Flash,
            generation_config: GenerationConfig::default(),
        };
        let err = transport.call(request).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Unavailable);
    }
}
