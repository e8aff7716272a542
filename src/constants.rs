//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Retry executor constants
pub mod retry {
    /// Default attempts per invocation (first try included)
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Delay before the second attempt (milliseconds); doubles each step
    pub const INITIAL_DELAY_MS: u64 = 2_000;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: u32 = 2;
}

/// Quality gate constants
pub mod quality {
    /// Generation/critique rounds per run
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Minimum critique score accepted without another round
    pub const DEFAULT_THRESHOLD: u8 = 75;

    /// Sampling temperature for generation calls
    pub const GENERATION_TEMPERATURE: f32 = 0.8;

    /// Sampling temperature for critique calls
    pub const CRITIQUE_TEMPERATURE: f32 = 0.2;

    /// Output cap for generated documents
    pub const MAX_OUTPUT_TOKENS: u32 = 2_048;
}

/// Staged analysis constants
pub mod pipeline {
    /// Raw posting text is cut to this many characters before extraction
    pub const MAX_INPUT_CHARS: usize = 15_000;

    /// Extraction is deterministic
    pub const EXTRACTION_TEMPERATURE: f32 = 0.0;

    /// Fit comparison temperature
    pub const ANALYSIS_TEMPERATURE: f32 = 0.2;
}

/// Telemetry constants
pub mod telemetry {
    /// Placeholder for redacted email addresses
    pub const EMAIL_PLACEHOLDER: &str = "[REDACTED_EMAIL]";

    /// Placeholder for redacted phone numbers
    pub const PHONE_PLACEHOLDER: &str = "[REDACTED_PHONE]";

    /// Date format of the daily usage counter
    pub const USAGE_DATE_FORMAT: &str = "%Y-%m-%d";
}

/// HTTP/Network constants
pub mod network {
    /// Google Generative Language API base
    pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

    /// Per-attempt LLM request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;
}
