//! Test doubles shared across module tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::ai::gateway::{Invoker, ModelResolver, SharedInvoker};
use crate::ai::model::{Content, GenerationConfig, InvocationResponse, ModelId};
use crate::ai::telemetry::{TelemetryRow, TelemetrySink};
use crate::types::{ErrorCategory, InvocationPath, JobfitError, LlmError, Result, UserId};

// =============================================================================
// Scripted model
// =============================================================================

/// One observed invocation
#[derive(Debug, Clone)]
pub struct Call {
    pub model: ModelId,
    pub config: GenerationConfig,
    pub prompt: String,
}

type Handler = Box<dyn FnMut(&Call) -> Result<InvocationResponse> + Send>;

struct Inner {
    handler: Mutex<Handler>,
    calls: Mutex<Vec<Call>>,
    delay: Option<Duration>,
}

/// Resolver whose invokers answer from a script instead of the network
#[derive(Clone)]
pub struct ScriptedResolver {
    inner: Arc<Inner>,
}

impl ScriptedResolver {
    pub fn new(handler: impl FnMut(&Call) -> Result<InvocationResponse> + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                handler: Mutex::new(Box::new(handler)),
                calls: Mutex::new(Vec::new()),
                delay: None,
            }),
        }
    }

    /// Answer calls in order; an exhausted script fails the call
    pub fn queue(responses: Vec<Result<InvocationResponse>>) -> Self {
        let mut queue: VecDeque<_> = responses.into();
        Self::new(move |_| {
            queue.pop_front().unwrap_or_else(|| {
                Err(LlmError::new(ErrorCategory::Unknown, "script exhausted").into())
            })
        })
    }

    /// Every call sleeps this long before answering
    pub fn with_delay(self, delay: Duration) -> Self {
        let inner = Arc::try_unwrap(self.inner)
            .unwrap_or_else(|_| panic!("with_delay must be called before cloning"));
        Self {
            inner: Arc::new(Inner {
                delay: Some(delay),
                ..inner
            }),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.calls.lock().unwrap().len()
    }
}

impl ModelResolver for ScriptedResolver {
    fn resolve(&self, model: ModelId, config: GenerationConfig) -> Result<SharedInvoker> {
        Ok(Arc::new(ScriptedInvoker {
            inner: Arc::clone(&self.inner),
            model,
            config,
        }))
    }
}

struct ScriptedInvoker {
    inner: Arc<Inner>,
    model: ModelId,
    config: GenerationConfig,
}

#[async_trait]
impl Invoker for ScriptedInvoker {
    async fn generate_content(&self, contents: &[Content]) -> Result<InvocationResponse> {
        let call = Call {
            model: self.model,
            config: self.config.clone(),
            prompt: contents
                .iter()
                .map(Content::text)
                .collect::<Vec<_>>()
                .join("\n"),
        };
        self.inner.calls.lock().unwrap().push(call.clone());

        if let Some(delay) = self.inner.delay {
            tokio::time::sleep(delay).await;
        }

        let mut handler = self.inner.handler.lock().unwrap();
        (*handler)(&call)
    }

    fn path(&self) -> InvocationPath {
        InvocationPath::Direct
    }

    fn model(&self) -> ModelId {
        self.model
    }
}

pub fn ok(text: &str) -> Result<InvocationResponse> {
    Ok(InvocationResponse::new(text))
}

pub fn llm_err(category: ErrorCategory, message: &str) -> Result<InvocationResponse> {
    Err(JobfitError::llm(category, message))
}

pub fn rate_limited() -> Result<InvocationResponse> {
    llm_err(ErrorCategory::RateLimit, "429 Too Many Requests")
}

// =============================================================================
// Recording sink
// =============================================================================

#[derive(Default)]
pub struct RecordingSink {
    rows: Mutex<Vec<TelemetryRow>>,
    increments: Mutex<Vec<(String, u32)>>,
    fail: bool,
}

impl RecordingSink {
    /// Every write fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn rows(&self) -> Vec<TelemetryRow> {
        self.rows.lock().unwrap().clone()
    }

    pub fn usage_increments(&self) -> Vec<(String, u32)> {
        self.increments.lock().unwrap().clone()
    }
}

#[async_trait]
impl TelemetrySink for RecordingSink {
    async fn write(&self, row: TelemetryRow) -> Result<()> {
        if self.fail {
            return Err(JobfitError::Storage("sink offline".to_string()));
        }
        self.rows.lock().unwrap().push(row);
        Ok(())
    }

    async fn increment_usage(&self, user_id: &UserId, tokens: u32) -> Result<()> {
        if self.fail {
            return Err(JobfitError::Storage("sink offline".to_string()));
        }
        self.increments
            .lock()
            .unwrap()
            .push((user_id.as_str().to_string(), tokens));
        Ok(())
    }
}
