//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/jobfit/) and project (.jobfit/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::ai::model::ModelId;
use crate::ai::retry::RetryPolicy;
use crate::ai::timeout::TimeoutConfig;
use crate::constants::{network, pipeline, quality, retry};
use crate::types::{JobfitError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM service and relay endpoints
    pub gateway: GatewayConfig,

    /// Model used by each call site
    pub models: ModelsConfig,

    /// Backoff for rate-limited calls
    pub retry: RetryConfig,

    /// Generation/critique loop settings
    pub quality: QualityConfig,

    /// Staged analysis settings
    pub pipeline: PipelineConfig,

    /// Invocation log settings
    pub telemetry: TelemetryConfig,

    /// Per-attempt deadlines
    pub timeouts: TimeoutsConfig,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `JobfitError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(JobfitError::Config(
                "retry.max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.quality.max_attempts == 0 {
            return Err(JobfitError::Config(
                "quality.max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.quality.threshold > 100 {
            return Err(JobfitError::Config(format!(
                "quality.threshold must be between 0 and 100, got {}",
                self.quality.threshold
            )));
        }

        if !(0.0..=2.0).contains(&self.quality.temperature) {
            return Err(JobfitError::Config(format!(
                "quality.temperature must be between 0.0 and 2.0, got {}",
                self.quality.temperature
            )));
        }

        if self.pipeline.max_input_chars == 0 {
            return Err(JobfitError::Config(
                "pipeline.max_input_chars must be greater than 0".to_string(),
            ));
        }

        if self.gateway.request_timeout_secs == 0
            || self.timeouts.attempt_secs == 0
            || self.timeouts.connect_secs == 0
        {
            return Err(JobfitError::Config(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        url::Url::parse(&self.gateway.api_base).map_err(|e| {
            JobfitError::Config(format!(
                "gateway.api_base is not a valid URL ({}): {}",
                self.gateway.api_base, e
            ))
        })?;

        if let Some(relay_url) = &self.gateway.relay_url {
            url::Url::parse(relay_url).map_err(|e| {
                JobfitError::Config(format!(
                    "gateway.relay_url is not a valid URL ({}): {}",
                    relay_url, e
                ))
            })?;
        }

        Ok(())
    }
}

// =============================================================================
// Gateway Configuration
// =============================================================================

/// Note: the API key is never serialized and is redacted in debug output.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Caller-supplied key for the direct path
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// LLM service base URL
    pub api_base: String,

    /// Backend relay endpoint used when no key is configured
    pub relay_url: Option<String>,

    /// Whole-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("relay_url", &self.relay_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: network::DEFAULT_API_BASE.to_string(),
            relay_url: None,
            request_timeout_secs: network::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// Model Selection
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Stage 1: cheap structured extraction
    pub extraction: ModelId,
    /// Stage 2: fit comparison
    pub analysis: ModelId,
    pub generation: ModelId,
    pub critique: ModelId,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            extraction: ModelId::FlashLite,
            analysis: ModelId::Pro,
            generation: ModelId::Flash,
            critique: ModelId::Flash,
        }
    }
}

// =============================================================================
// Retry / Quality / Pipeline
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per invocation, first try included
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles afterwards
    pub initial_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: retry::DEFAULT_MAX_ATTEMPTS,
            initial_delay_ms: retry::INITIAL_DELAY_MS,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub max_attempts: u32,
    /// Minimum critique score (0-100) that ends the loop
    pub threshold: u8,
    /// Generation temperature (0.0 = deterministic, 2.0 = most varied)
    pub temperature: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            max_attempts: quality::DEFAULT_MAX_ATTEMPTS,
            threshold: quality::DEFAULT_THRESHOLD,
            temperature: quality::GENERATION_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw posting text beyond this many characters is dropped
    pub max_input_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_input_chars: pipeline::MAX_INPUT_CHARS,
        }
    }
}

// =============================================================================
// Telemetry
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    /// SQLite file; defaults to the platform data directory
    pub database_path: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_path: None,
        }
    }
}

impl TelemetryConfig {
    /// Configured path, else `<data dir>/telemetry.db`
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path.clone().or_else(|| {
            directories::ProjectDirs::from("", "", "jobfit")
                .map(|dirs| dirs.data_dir().join("telemetry.db"))
        })
    }
}

// =============================================================================
// Timeouts
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Deadline for a single LLM attempt, in seconds
    pub attempt_secs: u64,
    /// HTTP connect timeout, in seconds
    pub connect_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            attempt_secs: network::DEFAULT_TIMEOUT_SECS,
            connect_secs: network::CONNECTION_TIMEOUT_SECS,
        }
    }
}

impl TimeoutsConfig {
    pub fn to_timeout_config(&self) -> TimeoutConfig {
        TimeoutConfig {
            llm_request: Duration::from_secs(self.attempt_secs),
            connection: Duration::from_secs(self.connect_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.quality.threshold, 75);
        assert_eq!(config.models.extraction, ModelId::FlashLite);
        assert_eq!(config.models.analysis, ModelId::Pro);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.quality.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_quality() {
        let mut config = Config::default();
        config.quality.threshold = 101;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.quality.temperature = 2.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let mut config = Config::default();
        config.gateway.relay_url = Some("not a url".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("relay_url"));
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = Config::default();
        config.timeouts.attempt_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_never_serialized_or_printed() {
        let mut config = Config::default();
        config.gateway.api_key = Some("AIza-secret".to_string());

        let toml = toml::to_string(&config).unwrap();
        assert!(!toml.contains("AIza-secret"));

        let debug = format!("{:?}", config.gateway);
        assert!(!debug.contains("AIza-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = RetryConfig::default().policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(2));
    }
}
