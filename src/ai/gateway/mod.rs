//! Model Gateway
//!
//! Resolves a model into an [`Invoker`] on one of two paths:
//!
//! - **Direct**: the caller supplied an API key; requests go straight to the
//!   LLM service.
//! - **Relay**: no key; requests are forwarded to the backend relay, which
//!   holds shared, metered credentials.
//!
//! Credentials are checked on every resolution, never cached, so a key added
//! or removed at runtime takes effect on the next call. Invokers do not log or
//! retry; failures come back as [`LlmError`] with a structured category.
//!
//! [`LlmError`]: crate::types::LlmError

mod direct;
mod relay;

pub use direct::DirectInvoker;
pub use relay::{
    HttpRelayTransport, RelayInvoker, RelayPayload, RelayReply, RelayRequest, RelayTransport,
    RelayTransportResult,
};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

use crate::ai::model::{Content, GenerationConfig, InvocationResponse, ModelId};
use crate::ai::session::SessionProvider;
use crate::config::GatewayConfig;
use crate::types::{InvocationPath, JobfitError, Result};

// =============================================================================
// Credentials
// =============================================================================

/// Source of the caller-supplied (BYOK) API key
pub trait CredentialProvider: Send + Sync {
    fn api_key(&self) -> Option<SecretString>;
}

/// Key fixed at construction
pub struct StaticCredentials(SecretString);

impl StaticCredentials {
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }
}

impl CredentialProvider for StaticCredentials {
    fn api_key(&self) -> Option<SecretString> {
        Some(self.0.clone())
    }
}

/// Always relay
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn api_key(&self) -> Option<SecretString> {
        None
    }
}

/// Key that can be set or cleared while the gateway is live
#[derive(Default)]
pub struct SharedCredentials {
    key: RwLock<Option<SecretString>>,
}

impl SharedCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>) {
        *self.key.write().unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Some(SecretString::from(key.into()));
    }

    pub fn clear(&self) {
        *self.key.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

impl CredentialProvider for SharedCredentials {
    fn api_key(&self) -> Option<SecretString> {
        self.key
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

// =============================================================================
// Invoker
// =============================================================================

/// Path-agnostic handle for one model + generation config
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn generate_content(&self, contents: &[Content]) -> Result<InvocationResponse>;

    fn path(&self) -> InvocationPath;

    fn model(&self) -> ModelId;
}

pub type SharedInvoker = Arc<dyn Invoker>;

/// Seam the orchestrators depend on
pub trait ModelResolver: Send + Sync {
    fn resolve(&self, model: ModelId, config: GenerationConfig) -> Result<SharedInvoker>;
}

pub type SharedResolver = Arc<dyn ModelResolver>;

// =============================================================================
// Gateway
// =============================================================================

pub struct ModelGateway {
    credentials: Arc<dyn CredentialProvider>,
    relay: Option<Arc<dyn RelayTransport>>,
    client: reqwest::Client,
    api_base: String,
}

impl std::fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGateway")
            .field("api_base", &self.api_base)
            .field("relay", &self.relay.is_some())
            .finish()
    }
}

impl ModelGateway {
    pub fn new(
        config: &GatewayConfig,
        connect_timeout: Duration,
        credentials: Arc<dyn CredentialProvider>,
        relay: Option<Arc<dyn RelayTransport>>,
    ) -> Result<Self> {
        let client = build_http_client(config.request_timeout(), connect_timeout)?;

        Ok(Self {
            credentials,
            relay,
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Build with an HTTP relay when `relay_url` is configured.
    ///
    /// A key in `config.api_key` takes precedence over `credentials`.
    pub fn from_config(
        config: &GatewayConfig,
        connect_timeout: Duration,
        credentials: Arc<dyn CredentialProvider>,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self> {
        let relay: Option<Arc<dyn RelayTransport>> = match &config.relay_url {
            Some(url) => {
                let client = build_http_client(config.request_timeout(), connect_timeout)?;
                Some(Arc::new(HttpRelayTransport::new(client, url.clone(), session)))
            }
            None => None,
        };

        let credentials: Arc<dyn CredentialProvider> = match &config.api_key {
            Some(key) => Arc::new(StaticCredentials::new(key.clone())),
            None => credentials,
        };

        Self::new(config, connect_timeout, credentials, relay)
    }

    fn current_key(&self) -> Option<SecretString> {
        self.credentials
            .api_key()
            .filter(|key| !key.expose_secret().trim().is_empty())
    }
}

impl ModelResolver for ModelGateway {
    fn resolve(&self, model: ModelId, config: GenerationConfig) -> Result<SharedInvoker> {
        if let Some(key) = self.current_key() {
            debug!(model = %model, path = "direct", "Resolved invoker");
            return Ok(Arc::new(DirectInvoker::new(
                self.client.clone(),
                &self.api_base,
                key,
                model,
                config,
            )));
        }

        match &self.relay {
            Some(transport) => {
                debug!(model = %model, path = "relay", "Resolved invoker");
                Ok(Arc::new(RelayInvoker::new(
                    Arc::clone(transport),
                    model,
                    config,
                )))
            }
            None => Err(JobfitError::Config(
                "No API key configured and no relay endpoint available".to_string(),
            )),
        }
    }
}

fn build_http_client(timeout: Duration, connect_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| JobfitError::Config(format!("Failed to create HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct UnusedTransport;

    #[async_trait]
    impl RelayTransport for UnusedTransport {
        async fn call(&self, _request: RelayRequest) -> RelayTransportResult {
            unreachable!("resolution must not perform a call")
        }
    }

    fn gateway(
        credentials: Arc<dyn CredentialProvider>,
        relay: Option<Arc<dyn RelayTransport>>,
    ) -> ModelGateway {
        ModelGateway::new(
            &GatewayConfig::default(),
            Duration::from_secs(5),
            credentials,
            relay,
        )
        .unwrap()
    }

    #[test]
    fn test_key_resolves_to_direct() {
        let gw = gateway(Arc::new(StaticCredentials::new("AIza-test")), None);
        let invoker = gw
            .resolve(ModelId::Flash, GenerationConfig::default())
            .unwrap();
        assert_eq!(invoker.path(), InvocationPath::Direct);
        assert_eq!(invoker.model(), ModelId::Flash);
    }

    #[test]
    fn test_missing_key_resolves_to_relay() {
        let gw = gateway(Arc::new(NoCredentials), Some(Arc::new(UnusedTransport)));
        let invoker = gw.resolve(ModelId::Pro, GenerationConfig::default()).unwrap();
        assert_eq!(invoker.path(), InvocationPath::Relay);
    }

    #[test]
    fn test_blank_key_is_treated_as_absent() {
        let gw = gateway(
            Arc::new(StaticCredentials::new("   ")),
            Some(Arc::new(UnusedTransport)),
        );
        let invoker = gw
            .resolve(ModelId::FlashLite, GenerationConfig::default())
            .unwrap();
        assert_eq!(invoker.path(), InvocationPath::Relay);
    }

    #[test]
    fn test_no_key_and_no_relay_is_config_error() {
        let gw = gateway(Arc::new(NoCredentials), None);
        let result = gw.resolve(ModelId::Flash, GenerationConfig::default());
        assert!(matches!(result, Err(JobfitError::Config(_))));
    }

    #[test]
    fn test_credentials_checked_on_every_resolve() {
        let credentials = Arc::new(SharedCredentials::new());
        let gw = gateway(credentials.clone(), Some(Arc::new(UnusedTransport)));

        let first = gw.resolve(ModelId::Flash, GenerationConfig::default()).unwrap();
        assert_eq!(first.path(), InvocationPath::Relay);

        credentials.set("AIza-added-later");
        let second = gw.resolve(ModelId::Flash, GenerationConfig::default()).unwrap();
        assert_eq!(second.path(), InvocationPath::Direct);

        credentials.clear();
        let third = gw.resolve(ModelId::Flash, GenerationConfig::default()).unwrap();
        assert_eq!(third.path(), InvocationPath::Relay);
    }

    #[test]
    fn test_config_key_overrides_provider() {
        let config = GatewayConfig {
            api_key: Some("AIza-from-config".to_string()),
            ..Default::default()
        };
        let gw = ModelGateway::from_config(
            &config,
            Duration::from_secs(5),
            Arc::new(NoCredentials),
            Arc::new(crate::ai::session::AnonymousSession),
        )
        .unwrap();
        let invoker = gw.resolve(ModelId::Flash, GenerationConfig::default()).unwrap();
        assert_eq!(invoker.path(), InvocationPath::Direct);
    }
}
