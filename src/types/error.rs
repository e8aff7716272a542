//! Unified Error Type System
//!
//! Centralized error types for the orchestration core.
//! Invokers attach a structured [`ErrorCategory`] at the gateway boundary so
//! the retry executor never has to inspect message text.
//!
//! ## Error Categories
//!
//! - **DailyQuota**: Per-day cap reached (fail fast, never retried)
//! - **RateLimit**: Per-minute traffic limits (wait and retry)
//! - **Auth**: Credentials rejected (fail fast)
//! - **Network / Relay**: Transport faults (fail fast, translated once)
//! - **Validation / ParseError**: Structured output problems (fail fast)

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Structured error kinds assigned where an error first enters the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Per-day quota exhausted - permanent for today
    DailyQuota,
    /// Rate limited or traffic spike - wait then retry
    RateLimit,
    /// Credentials rejected
    Auth,
    /// Direct transport failure
    Network,
    /// Relay endpoint failure (transport or application level)
    Relay,
    /// Request rejected as malformed
    BadRequest,
    /// Upstream service unavailable
    Unavailable,
    /// Structured response failed validation
    Validation,
    /// Structured response was not valid JSON
    ParseError,
    /// Attempt exceeded its deadline
    Timeout,
    /// Caller cancelled the request
    Cancelled,
    /// Unknown error
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DailyQuota => write!(f, "DAILY_QUOTA"),
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Relay => write!(f, "RELAY"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Only transient quota/traffic errors are expected to clear within seconds
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit)
    }

    /// Stable code used by the relay endpoint for application errors
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "daily_quota" | "quota_per_day" => Some(Self::DailyQuota),
            "rate_limit" | "resource_exhausted" => Some(Self::RateLimit),
            "unauthenticated" | "permission_denied" | "auth" => Some(Self::Auth),
            "invalid_argument" | "bad_request" => Some(Self::BadRequest),
            "unavailable" | "internal" => Some(Self::Unavailable),
            _ => None,
        }
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Which invocation path produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationPath {
    /// Caller-supplied credentials, straight to the LLM service
    Direct,
    /// Shared credentials through the backend relay
    Relay,
}

impl std::fmt::Display for InvocationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Relay => write!(f, "relay"),
        }
    }
}

/// Invocation error with a structured category
#[derive(Debug, Clone)]
pub struct LlmError {
    pub category: ErrorCategory,
    pub message: String,
    pub path: Option<InvocationPath>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "[{}:{}] {}", path, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            path: None,
        }
    }

    /// Attach the invocation path
    pub fn via(mut self, path: InvocationPath) -> Self {
        self.path = Some(path);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Classifier used at the gateway boundary only.
///
/// Relay errors that arrive without a structured code are matched here once;
/// everything downstream branches on [`ErrorCategory`].
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a free-form upstream message
    pub fn classify(message: &str) -> ErrorCategory {
        let lower = message.to_lowercase();

        if lower.contains("perday") || lower.contains("per day") || lower.contains("per_day") {
            return ErrorCategory::DailyQuota;
        }

        if lower.contains("429")
            || lower.contains("quota")
            || lower.contains("rate limit")
            || lower.contains("resource_exhausted")
            || lower.contains("too many requests")
            || lower.contains("overloaded")
        {
            return ErrorCategory::RateLimit;
        }

        if lower.contains("401")
            || lower.contains("403")
            || lower.contains("api key")
            || lower.contains("unauthorized")
            || lower.contains("permission denied")
        {
            return ErrorCategory::Auth;
        }

        if lower.contains("400")
            || lower.contains("invalid argument")
            || lower.contains("malformed")
        {
            return ErrorCategory::BadRequest;
        }

        if lower.contains("500")
            || lower.contains("502")
            || lower.contains("503")
            || lower.contains("unavailable")
        {
            return ErrorCategory::Unavailable;
        }

        ErrorCategory::Unknown
    }

    /// Classify an HTTP status, consulting the body only where the status is ambiguous
    pub fn classify_http_status(status: u16, body: &str) -> ErrorCategory {
        match status {
            429 => Self::refine(ErrorCategory::RateLimit, body),
            401 | 403 => ErrorCategory::Auth,
            400 => ErrorCategory::BadRequest,
            500..=599 => Self::refine(ErrorCategory::Unavailable, body),
            _ => ErrorCategory::Unknown,
        }
    }

    /// Sharpen a status- or code-derived category using the message.
    ///
    /// The service reports per-minute and per-day caps under one status, and
    /// overload under the generic unavailable status; only the message tells
    /// them apart. Both invocation paths go through here.
    pub fn refine(category: ErrorCategory, message: &str) -> ErrorCategory {
        match (category, Self::classify(message)) {
            (ErrorCategory::RateLimit, ErrorCategory::DailyQuota) => ErrorCategory::DailyQuota,
            (ErrorCategory::Unavailable, ErrorCategory::RateLimit) => ErrorCategory::RateLimit,
            _ => category,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Structured validation error with context
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub field: Option<String>,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "Validation failed for '{}': {}", field, self.message)
        } else {
            write!(f, "Validation failed: {}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            message: message.into(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// The model returned no text at all
    pub fn empty_response(context: &str) -> Self {
        Self::new(
            ValidationErrorKind::EmptyResponse,
            format!("{} returned an empty response", context),
        )
    }

    /// A required top-level field is absent or null
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ValidationErrorKind::MissingField,
            "required field is missing from the response",
        )
        .with_field(field)
    }
}

/// Validation error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    EmptyResponse,
    MissingField,
    Range,
    General,
}

// =============================================================================
// Application Error
// =============================================================================

pub const DAILY_QUOTA_MESSAGE: &str =
    "You've reached today's AI usage limit. Please come back tomorrow.";

pub const RATE_LIMIT_MESSAGE: &str =
    "The AI service is receiving too many requests right now. Please wait a minute and try again.";

#[derive(Debug, Error)]
pub enum JobfitError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Invocation Errors
    // -------------------------------------------------------------------------
    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    #[error("{0}")]
    Validation(ValidationError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Terminal Errors (raised once by the retry executor)
    // -------------------------------------------------------------------------
    #[error("{}", DAILY_QUOTA_MESSAGE)]
    DailyQuotaExceeded,

    #[error("{}", RATE_LIMIT_MESSAGE)]
    RateLimitExceeded { attempts: u32 },

    #[error("{message}")]
    Failed {
        category: ErrorCategory,
        message: String,
    },

    #[error("The request failed after {attempts} attempts. Please try again.")]
    RetriesExhausted { attempts: u32 },

    #[error("The request was cancelled.")]
    Cancelled,
}

impl From<LlmError> for JobfitError {
    fn from(err: LlmError) -> Self {
        JobfitError::Llm(err)
    }
}

impl From<ValidationError> for JobfitError {
    fn from(err: ValidationError) -> Self {
        JobfitError::Validation(err)
    }
}

pub type Result<T> = std::result::Result<T, JobfitError>;

impl JobfitError {
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn llm(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self::Llm(LlmError::new(category, message))
    }

    /// Structured category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Llm(e) => e.category,
            Self::Failed { category, .. } => *category,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Json(_) => ErrorCategory::ParseError,
            Self::DailyQuotaExceeded => ErrorCategory::DailyQuota,
            Self::RateLimitExceeded { .. } => ErrorCategory::RateLimit,
            Self::Cancelled => ErrorCategory::Cancelled,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Whether this error already carries its final user-facing message
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::DailyQuotaExceeded
                | Self::RateLimitExceeded { .. }
                | Self::Failed { .. }
                | Self::RetriesExhausted { .. }
                | Self::Cancelled
        )
    }

    /// Translate into the terminal, user-facing form.
    ///
    /// Terminal errors pass through unchanged so a message is never translated twice.
    pub fn into_user_facing(self) -> Self {
        if self.is_terminal() {
            return self;
        }
        let category = self.category();
        let message = user_message(&self);
        Self::Failed { category, message }
    }
}

/// Attach context to foreign errors, mapping them to [`JobfitError::Storage`]
pub trait ResultExt<T> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Lazy variant of [`ResultExt::with_context`]
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| JobfitError::Storage(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| JobfitError::Storage(format!("{}: {}", f().into(), e)))
    }
}

/// Human-readable message suitable for direct display
pub fn user_message(err: &JobfitError) -> String {
    match err {
        JobfitError::Llm(e) => match e.category {
            ErrorCategory::DailyQuota => DAILY_QUOTA_MESSAGE.to_string(),
            ErrorCategory::RateLimit => RATE_LIMIT_MESSAGE.to_string(),
            ErrorCategory::Auth => {
                "Your API key was rejected. Check the key in settings or remove it to use the shared service."
                    .to_string()
            }
            ErrorCategory::Network => {
                "Could not reach the AI service. Check your connection and try again.".to_string()
            }
            ErrorCategory::Relay => {
                format!("The AI relay could not complete the request: {}", e.message)
            }
            ErrorCategory::BadRequest => {
                format!("The AI service rejected the request: {}", e.message)
            }
            ErrorCategory::Unavailable => {
                "The AI service is temporarily unavailable. Please try again shortly.".to_string()
            }
            _ => format!("AI request failed: {}", e.message),
        },
        JobfitError::Json(e) => format!("The AI response could not be parsed: {}", e),
        JobfitError::Validation(e) => format!("The AI response was incomplete. {}", e),
        JobfitError::Timeout { duration, .. } => format!(
            "The AI service did not respond within {} seconds. Please try again.",
            duration.as_secs()
        ),
        other => other.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::DailyQuota.to_string(), "DAILY_QUOTA");
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::Relay.to_string(), "RELAY");
    }

    #[test]
    fn test_only_rate_limit_is_retryable() {
        assert!(ErrorCategory::RateLimit.is_retryable());
        assert!(!ErrorCategory::DailyQuota.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::Network.is_retryable());
        assert!(!ErrorCategory::ParseError.is_retryable());
        assert!(!ErrorCategory::Timeout.is_retryable());
    }

    #[test]
    fn test_classify_daily_quota_before_rate_limit() {
        let category = ErrorClassifier::classify(
            "429 Quota exceeded for metric GenerateRequestsPerDayPerProjectPerModel",
        );
        assert_eq!(category, ErrorCategory::DailyQuota);
    }

    #[test]
    fn test_classify_rate_limit() {
        assert_eq!(
            ErrorClassifier::classify("429 Too Many Requests"),
            ErrorCategory::RateLimit
        );
        assert_eq!(
            ErrorClassifier::classify("Quota exceeded for requests per minute"),
            ErrorCategory::RateLimit
        );
    }

    #[test]
    fn test_classify_auth_and_unknown() {
        assert_eq!(
            ErrorClassifier::classify("API key not valid. Please pass a valid API key."),
            ErrorCategory::Auth
        );
        assert_eq!(
            ErrorClassifier::classify("Something weird happened"),
            ErrorCategory::Unknown
        );
    }

    #[test]
    fn test_classify_http_status() {
        assert_eq!(
            ErrorClassifier::classify_http_status(429, "requests per minute"),
            ErrorCategory::RateLimit
        );
        assert_eq!(
            ErrorClassifier::classify_http_status(429, "GenerateRequestsPerDay"),
            ErrorCategory::DailyQuota
        );
        assert_eq!(
            ErrorClassifier::classify_http_status(403, ""),
            ErrorCategory::Auth
        );
        assert_eq!(
            ErrorClassifier::classify_http_status(503, ""),
            ErrorCategory::Unavailable
        );
    }

    #[test]
    fn test_overload_is_rate_limit_on_every_path() {
        let body = "The model is overloaded. Please try again later.";
        assert_eq!(ErrorClassifier::classify(body), ErrorCategory::RateLimit);
        assert_eq!(
            ErrorClassifier::classify_http_status(503, body),
            ErrorCategory::RateLimit
        );
        assert_eq!(
            ErrorClassifier::refine(ErrorCategory::Unavailable, body),
            ErrorCategory::RateLimit
        );
        assert_eq!(
            ErrorClassifier::classify_http_status(500, "Internal error encountered."),
            ErrorCategory::Unavailable
        );
    }

    #[test]
    fn test_refine_splits_daily_quota_from_rate_limit() {
        let body = "Quota exceeded for metric: generativelanguage.googleapis.com/generate_content_free_tier_requests, limit: GenerateRequestsPerDayPerProjectPerModel-FreeTier";
        assert_eq!(
            ErrorClassifier::refine(ErrorCategory::RateLimit, body),
            ErrorCategory::DailyQuota
        );
        assert_eq!(
            ErrorClassifier::refine(ErrorCategory::RateLimit, "requests per minute"),
            ErrorCategory::RateLimit
        );
        assert_eq!(
            ErrorClassifier::refine(ErrorCategory::Auth, body),
            ErrorCategory::Auth
        );
    }

    #[test]
    fn test_relay_codes() {
        assert_eq!(
            ErrorCategory::from_code("RESOURCE_EXHAUSTED"),
            Some(ErrorCategory::RateLimit)
        );
        assert_eq!(
            ErrorCategory::from_code("daily_quota"),
            Some(ErrorCategory::DailyQuota)
        );
        assert_eq!(ErrorCategory::from_code("mystery"), None);
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::new(ErrorCategory::RateLimit, "Too many requests")
            .via(InvocationPath::Relay);
        assert_eq!(err.to_string(), "[relay:RATE_LIMIT] Too many requests");

        let bare = LlmError::new(ErrorCategory::Network, "Connection failed");
        assert_eq!(bare.to_string(), "[NETWORK] Connection failed");
    }

    #[test]
    fn test_into_user_facing_translates_once() {
        let err = JobfitError::llm(ErrorCategory::Auth, "API key not valid");
        let translated = err.into_user_facing();
        let first = translated.to_string();
        assert!(first.contains("API key was rejected"));
        assert_eq!(translated.category(), ErrorCategory::Auth);

        let again = translated.into_user_facing();
        assert_eq!(again.to_string(), first);
    }

    #[test]
    fn test_validation_message() {
        let err: JobfitError = ValidationError::missing_field("job").into();
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.to_string().contains("'job'"));
    }

    #[test]
    fn test_result_ext_context() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("disk full"));
        let err = result.with_context("Failed to write row").unwrap_err();
        assert_eq!(err.to_string(), "Storage error: Failed to write row: disk full");

        let ok: std::result::Result<u8, std::io::Error> = Ok(1);
        let value = ok
            .with_context_fn(|| -> String { panic!("context built for a success") })
            .unwrap();
        assert_eq!(value, 1);

        let failed: std::result::Result<u8, std::io::Error> =
            Err(std::io::Error::other("locked"));
        let err = failed
            .with_context_fn(|| format!("Failed to open {}", "telemetry.db"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Storage error: Failed to open telemetry.db: locked");
    }

    #[test]
    fn test_terminal_messages() {
        assert_eq!(JobfitError::DailyQuotaExceeded.to_string(), DAILY_QUOTA_MESSAGE);
        assert_eq!(
            JobfitError::RateLimitExceeded { attempts: 3 }.to_string(),
            RATE_LIMIT_MESSAGE
        );
    }
}
