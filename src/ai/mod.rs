//! AI Integration Layer
//!
//! Model gateway, retried invocation, telemetry and prompt construction
//! shared by the analysis pipeline and the quality gate.

pub mod client;
pub mod gateway;
pub mod json;
pub mod model;
pub mod progress;
pub mod prompt;
pub mod retry;
pub mod session;
pub mod telemetry;
pub mod timeout;

pub use client::LlmClient;
pub use gateway::{
    CredentialProvider, DirectInvoker, HttpRelayTransport, Invoker, ModelGateway, ModelResolver,
    NoCredentials, RelayInvoker, RelayTransport, SharedCredentials, SharedInvoker, SharedResolver,
    StaticCredentials,
};
pub use json::{normalize_score, parse_value, require_fields, strip_code_fences};
pub use model::{
    Content, GenerationConfig, InvocationRequest, InvocationResponse, ModelId, Part, Role,
    UsageMetadata,
};
pub use progress::{ProgressEvent, ProgressReporter};
pub use prompt::{CRITIQUE_RUBRIC, PromptBuilder, PromptSection, PromptTemplates};
pub use retry::{CallOptions, ExecutionMetadata, InvocationContext, RetryExecutor, RetryPolicy};
pub use session::{AnonymousSession, SessionProvider, StaticSession};
pub use telemetry::{
    EventType, InMemoryUsageStore, NoopSink, TelemetryEvent, TelemetryLogger, TelemetryRow,
    TelemetrySink, TelemetryStatus, UsageCounter, UsageCounterStore, redact_pii,
};
pub use timeout::{TimeoutConfig, with_timeout};
