//! Timeout Helpers
//!
//! Every LLM attempt is bounded. The upstream service has no deadline of its
//! own, so a hung request would otherwise block the caller indefinitely.
//!
//! ```ignore
//! let config = TimeoutConfig::default();
//! let response = with_timeout(config.llm_request, invoker.generate_content(&contents), "generateContent").await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::constants::network as net_constants;
use crate::types::{JobfitError, Result};

/// Timeouts applied by the orchestration core
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeoutConfig {
    /// Per-attempt LLM request timeout (default: 2 minutes)
    pub llm_request: Duration,
    /// HTTP connect timeout (default: 30 seconds)
    pub connection: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_request: Duration::from_secs(net_constants::DEFAULT_TIMEOUT_SECS),
            connection: Duration::from_secs(net_constants::CONNECTION_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    pub fn new(llm_request: Duration) -> Self {
        Self {
            llm_request,
            ..Default::default()
        }
    }
}

/// Execute an async operation with a timeout
///
/// Returns [`JobfitError::Timeout`] if the operation doesn't complete in time.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(JobfitError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorCategory;

    #[test]
    fn test_timeout_config_defaults() {
        let config = TimeoutConfig::default();
        assert_eq!(config.llm_request.as_secs(), 120);
        assert_eq!(config.connection.as_secs(), 30);
    }

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, JobfitError>(42) },
            "test operation",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, JobfitError>(42)
            },
            "slow operation",
        )
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, JobfitError::Timeout { .. }));
        assert_eq!(err.category(), ErrorCategory::Timeout);
    }
}
