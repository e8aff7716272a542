//! Top-level wiring
//!
//! Builds the gateway, telemetry, retry executor and both orchestrators from
//! a validated [`Config`].

use std::sync::Arc;

use crate::ai::client::LlmClient;
use crate::ai::gateway::{CredentialProvider, ModelGateway, SharedResolver};
use crate::ai::retry::{CallOptions, RetryExecutor};
use crate::ai::session::SessionProvider;
use crate::ai::telemetry::TelemetryLogger;
use crate::analysis::{AnalysisPipeline, AnalysisRequest};
use crate::config::Config;
use crate::generation::{
    GenerationRequest, GenerationResult, QualityGateGenerator, Variant, VariantOutput,
};
use crate::storage::{Database, SharedDatabase};
use crate::types::{JobAnalysis, Result};

pub struct Orchestrator {
    config: Config,
    client: LlmClient,
    telemetry: Arc<TelemetryLogger>,
    database: Option<SharedDatabase>,
}

impl Orchestrator {
    /// Wire everything from configuration.
    ///
    /// A telemetry database that cannot be opened disables telemetry with a
    /// warning rather than failing construction.
    pub fn from_config(
        config: Config,
        credentials: Arc<dyn CredentialProvider>,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let timeouts = config.timeouts.to_timeout_config();

        let gateway = ModelGateway::from_config(
            &config.gateway,
            timeouts.connection,
            credentials,
            Arc::clone(&session),
        )?;

        let database = if config.telemetry.enabled {
            Self::open_database(&config)
        } else {
            None
        };

        let telemetry = Arc::new(match &database {
            Some(db) => TelemetryLogger::new(db.clone(), db.clone(), session),
            None => TelemetryLogger::disabled(),
        });

        let mut orchestrator = Self::with_resolver(config, Arc::new(gateway), telemetry);
        orchestrator.database = database;
        Ok(orchestrator)
    }

    /// Wire around an existing resolver and telemetry logger
    pub fn with_resolver(
        config: Config,
        resolver: SharedResolver,
        telemetry: Arc<TelemetryLogger>,
    ) -> Self {
        let executor = Arc::new(RetryExecutor::new(
            Arc::clone(&telemetry),
            config.timeouts.to_timeout_config().llm_request,
        ));
        let client = LlmClient::new(resolver, executor, config.retry.policy());

        Self {
            config,
            client,
            telemetry,
            database: None,
        }
    }

    fn open_database(config: &Config) -> Option<SharedDatabase> {
        let path = config.telemetry.resolved_database_path()?;
        match Database::open(&path).and_then(|db| db.initialize().map(|_| db)) {
            Ok(db) => {
                tracing::info!("Telemetry database: {}", path.display());
                Some(Arc::new(db))
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Telemetry database unavailable, telemetry disabled"
                );
                None
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn telemetry(&self) -> &Arc<TelemetryLogger> {
        &self.telemetry
    }

    pub fn database(&self) -> Option<&SharedDatabase> {
        self.database.as_ref()
    }

    pub fn analysis_pipeline(&self) -> AnalysisPipeline {
        AnalysisPipeline::new(
            self.client.clone(),
            &self.config.models,
            &self.config.pipeline,
        )
    }

    pub fn generator(&self) -> QualityGateGenerator {
        QualityGateGenerator::new(
            self.client.clone(),
            &self.config.models,
            &self.config.quality,
        )
    }

    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
        options: &CallOptions,
    ) -> Result<JobAnalysis> {
        self.analysis_pipeline().run(request, options).await
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        options: &CallOptions,
    ) -> Result<GenerationResult> {
        self.generator().run(request, options).await
    }

    pub async fn compare_variants(
        &self,
        request: &GenerationRequest,
        variants: &[Variant],
        options: &CallOptions,
    ) -> Vec<VariantOutput> {
        self.generator()
            .compare_variants(request, variants, options)
            .await
    }

    /// Wait for queued telemetry writes
    pub async fn shutdown(&self) {
        self.telemetry.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::gateway::{NoCredentials, StaticCredentials};
    use crate::ai::model::InvocationResponse;
    use crate::ai::session::{AnonymousSession, StaticSession};
    use crate::ai::telemetry::{InMemoryUsageStore, TelemetryStatus};
    use crate::generation::ArtifactKind;
    use crate::testing::{Call, RecordingSink, ScriptedResolver};
    use serde_json::json;

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        let err = Orchestrator::from_config(
            config,
            Arc::new(NoCredentials),
            Arc::new(AnonymousSession),
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("retry.max_attempts"));
    }

    #[tokio::test]
    async fn test_from_config_opens_telemetry_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.telemetry.database_path = Some(dir.path().join("telemetry.db"));

        let orchestrator = Orchestrator::from_config(
            config,
            Arc::new(StaticCredentials::new("AIza-test")),
            Arc::new(StaticSession::new("user-1")),
        )
        .unwrap();

        let db = orchestrator.database().unwrap();
        assert!(db.recent_telemetry(10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_telemetry_has_no_database() {
        let mut config = Config::default();
        config.telemetry.enabled = false;
        let orchestrator =
            Orchestrator::from_config(config, Arc::new(NoCredentials), Arc::new(AnonymousSession))
                .unwrap();
        assert!(orchestrator.database().is_none());
    }

    #[tokio::test]
    async fn test_end_to_end_with_scripted_model() {
        let resolver = ScriptedResolver::new(|call: &Call| {
            let body = if call.config.is_structured() {
                json!({ "score": 88, "decision": "accept", "feedback": [] }).to_string()
            } else {
                "Dear hiring team".to_string()
            };
            Ok(InvocationResponse::new(body))
        });
        let sink = Arc::new(RecordingSink::default());
        let telemetry = Arc::new(TelemetryLogger::new(
            sink.clone(),
            Arc::new(InMemoryUsageStore::new()),
            Arc::new(AnonymousSession),
        ));
        let orchestrator =
            Orchestrator::with_resolver(Config::default(), Arc::new(resolver), telemetry);

        let result = orchestrator
            .generate(
                &GenerationRequest::new(ArtifactKind::CoverLetter, "Acme, backend role"),
                &CallOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(result.text, "Dear hiring team");
        assert_eq!(result.attempts_taken, 1);

        orchestrator.shutdown().await;
        let rows = sink.rows();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.status == TelemetryStatus::Success));
    }
}
