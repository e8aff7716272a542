//! Retry Executor
//!
//! Wraps a single LLM invocation with attempt counting, exponential backoff,
//! per-attempt timeouts, cancellation, progress notification and telemetry.
//!
//! ## Outcome contract
//!
//! A call either returns a value that was logged as `success`, or fails after
//! logging exactly one `error` record for the terminal failure. Intermediate
//! rate-limit failures are not logged as errors.
//!
//! ## Classification
//!
//! | Category            | Behavior                                             |
//! |---------------------|------------------------------------------------------|
//! | `DailyQuota`        | fail immediately with [`JobfitError::DailyQuotaExceeded`] |
//! | `RateLimit`         | back off (`initial * 2^(k-2)` before attempt k) and retry |
//! | `RateLimit`, last   | fail with [`JobfitError::RateLimitExceeded`]         |
//! | anything else       | fail immediately, translated once                    |

use serde_json::{Map, Value};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ai::model::{ModelId, UsageMetadata};
use crate::ai::progress::ProgressReporter;
use crate::ai::telemetry::{EventType, TelemetryEvent, TelemetryLogger, TelemetryStatus};
use crate::ai::timeout::with_timeout;
use crate::constants::retry as retry_constants;
use crate::types::{ErrorCategory, JobfitError, Result};

// =============================================================================
// Policy
// =============================================================================

/// Backoff policy; the multiplier is fixed at 2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: retry_constants::DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(retry_constants::INITIAL_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }

    /// Sleep before 1-based `attempt`; zero for the first attempt
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let factor = retry_constants::BACKOFF_FACTOR.saturating_pow(attempt - 2);
        self.initial_delay.saturating_mul(factor)
    }
}

// =============================================================================
// Context / Metadata / Options
// =============================================================================

/// Observability data carried alongside a call; never affects the call
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub event_type: EventType,
    pub model: ModelId,
    pub prompt: String,
    pub metadata: Map<String, Value>,
}

impl InvocationContext {
    pub fn new(event_type: EventType, model: ModelId, prompt: impl Into<String>) -> Self {
        Self {
            event_type,
            model,
            prompt: prompt.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Default)]
struct MetadataState {
    fields: Map<String, Value>,
    usage: Option<UsageMetadata>,
    response_text: Option<String>,
}

/// Scratch record the wrapped call fills in after it returns.
///
/// Token usage is only known once the call completes but must be logged
/// together with its outcome. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct ExecutionMetadata {
    state: Arc<Mutex<MetadataState>>,
}

impl ExecutionMetadata {
    pub fn insert(&self, key: &str, value: impl Into<Value>) {
        self.lock().fields.insert(key.to_string(), value.into());
    }

    pub fn record_usage(&self, usage: UsageMetadata) {
        self.lock().usage = Some(usage);
    }

    pub fn set_response_text(&self, text: impl Into<String>) {
        self.lock().response_text = Some(text.into());
    }

    pub fn usage(&self) -> Option<UsageMetadata> {
        self.lock().usage
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MetadataState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Per-call knobs supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub progress: Option<ProgressReporter>,
    pub cancel: CancellationToken,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

// =============================================================================
// Executor
// =============================================================================

pub struct RetryExecutor {
    telemetry: Arc<TelemetryLogger>,
    attempt_timeout: Duration,
}

impl RetryExecutor {
    pub fn new(telemetry: Arc<TelemetryLogger>, attempt_timeout: Duration) -> Self {
        Self {
            telemetry,
            attempt_timeout,
        }
    }

    pub fn telemetry(&self) -> &Arc<TelemetryLogger> {
        &self.telemetry
    }

    /// Run `op` under `policy`. `op` receives a fresh [`ExecutionMetadata`]
    /// per attempt.
    pub async fn execute<T, F, Fut>(
        &self,
        context: &InvocationContext,
        policy: &RetryPolicy,
        options: &CallOptions,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut(ExecutionMetadata) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let max_attempts = policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let metadata = ExecutionMetadata::default();

            debug!(
                event_type = %context.event_type,
                model = %context.model,
                attempt,
                max_attempts,
                "Invocation attempt"
            );

            let outcome = tokio::select! {
                biased;
                _ = options.cancel.cancelled() => Err(JobfitError::Cancelled),
                result = with_timeout(
                    self.attempt_timeout,
                    op(metadata.clone()),
                    context.event_type.as_str(),
                ) => result,
            };

            let err = match outcome {
                Ok(value) => {
                    info!(
                        event_type = %context.event_type,
                        model = %context.model,
                        attempt,
                        latency_ms = start.elapsed().as_millis() as u64,
                        "Invocation succeeded"
                    );
                    self.log_success(context, start, attempt, &metadata);
                    return Ok(value);
                }
                Err(err) => err,
            };

            match err.category() {
                ErrorCategory::DailyQuota => {
                    warn!(event_type = %context.event_type, error = %err, "Daily quota exhausted");
                    self.log_error(context, start, attempt, &err);
                    return Err(JobfitError::DailyQuotaExceeded);
                }
                ErrorCategory::RateLimit if attempt < max_attempts => {
                    let next = attempt + 1;
                    let delay = policy.delay_before(next);
                    warn!(
                        event_type = %context.event_type,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Rate limited, backing off"
                    );
                    if let Some(progress) = &options.progress {
                        progress.retrying(next, max_attempts, delay);
                    }

                    tokio::select! {
                        biased;
                        _ = options.cancel.cancelled() => {
                            return Err(self.fail(context, start, attempt, JobfitError::Cancelled));
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                ErrorCategory::RateLimit => {
                    warn!(
                        event_type = %context.event_type,
                        attempts = attempt,
                        "Rate limit retries exhausted"
                    );
                    self.log_error(context, start, attempt, &err);
                    return Err(JobfitError::RateLimitExceeded { attempts: attempt });
                }
                category => {
                    warn!(
                        event_type = %context.event_type,
                        attempt,
                        %category,
                        error = %err,
                        "Invocation failed"
                    );
                    return Err(self.fail(context, start, attempt, err));
                }
            }
        }

        Err(self.fail(
            context,
            start,
            max_attempts,
            JobfitError::RetriesExhausted {
                attempts: max_attempts,
            },
        ))
    }

    /// Log the terminal error and translate it for display
    fn fail(
        &self,
        context: &InvocationContext,
        start: Instant,
        attempt: u32,
        err: JobfitError,
    ) -> JobfitError {
        self.log_error(context, start, attempt, &err);
        err.into_user_facing()
    }

    fn log_success(
        &self,
        context: &InvocationContext,
        start: Instant,
        attempt: u32,
        metadata: &ExecutionMetadata,
    ) {
        let state = std::mem::take(&mut *metadata.lock());

        let mut merged = context.metadata.clone();
        merged.extend(state.fields);
        merged.insert("attempts".to_string(), attempt.into());
        if let Some(usage) = &state.usage {
            merged.insert("prompt_tokens".to_string(), usage.prompt_token_count.into());
            merged.insert(
                "candidates_tokens".to_string(),
                usage.candidates_token_count.into(),
            );
            merged.insert("total_tokens".to_string(), usage.total().into());
        }

        self.telemetry.record(TelemetryEvent {
            event_type: context.event_type,
            model: context.model,
            prompt: context.prompt.clone(),
            response: state.response_text,
            latency: start.elapsed(),
            status: TelemetryStatus::Success,
            error_message: None,
            metadata: merged,
            total_tokens: state.usage.map(|u| u.total()),
        });
    }

    fn log_error(
        &self,
        context: &InvocationContext,
        start: Instant,
        attempt: u32,
        err: &JobfitError,
    ) {
        let mut metadata = context.metadata.clone();
        metadata.insert("attempts".to_string(), attempt.into());
        metadata.insert("category".to_string(), err.category().to_string().into());

        self.telemetry.record(TelemetryEvent {
            event_type: context.event_type,
            model: context.model,
            prompt: context.prompt.clone(),
            response: None,
            latency: start.elapsed(),
            status: TelemetryStatus::Error,
            error_message: Some(err.to_string()),
            metadata,
            total_tokens: None,
        });
    }
}
