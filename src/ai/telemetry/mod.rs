//! Invocation Telemetry
//!
//! Every orchestrated LLM call produces exactly one record, success or error.
//! Recording is fire-and-forget: the write runs on a background task, and any
//! failure there is logged locally and swallowed. Telemetry can never fail or
//! delay the request it describes.
//!
//! ## Usage counters
//!
//! Successful analysis-class events also bump:
//! - a local, date-scoped counter ([`UsageCounterStore`]), reset whenever the
//!   stored date is not today
//! - the server-side per-user token counter ([`TelemetrySink::increment_usage`]),
//!   when a user is signed in and a token figure is known

mod redact;

pub use redact::redact_pii;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::ai::model::ModelId;
use crate::ai::session::{AnonymousSession, SessionProvider};
use crate::constants::telemetry::USAGE_DATE_FORMAT;
use crate::types::{Result, UserId};

// =============================================================================
// Event Types
// =============================================================================

/// Telemetry tag for each call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    JobExtraction,
    FitAnalysis,
    Generation,
    Critique,
    VariantComparison,
}

impl EventType {
    /// Analysis-class events count against the daily usage budget
    pub fn is_analysis(&self) -> bool {
        matches!(self, Self::JobExtraction | Self::FitAnalysis)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JobExtraction => "job_extraction",
            Self::FitAnalysis => "fit_analysis",
            Self::Generation => "generation",
            Self::Critique => "critique",
            Self::VariantComparison => "variant_comparison",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryStatus {
    Success,
    Error,
}

impl TelemetryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// What a caller hands to [`TelemetryLogger::record`]; text is unredacted
#[derive(Debug, Clone)]
pub struct TelemetryEvent {
    pub event_type: EventType,
    pub model: ModelId,
    pub prompt: String,
    pub response: Option<String>,
    pub latency: Duration,
    pub status: TelemetryStatus,
    pub error_message: Option<String>,
    pub metadata: Map<String, Value>,
    pub total_tokens: Option<u32>,
}

/// One persisted row; text fields are already redacted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRow {
    pub user_id: Option<String>,
    pub event_type: EventType,
    pub model_name: ModelId,
    pub prompt_text: String,
    pub response_text: Option<String>,
    pub latency_ms: u64,
    pub status: TelemetryStatus,
    pub error_message: Option<String>,
    pub metadata: Value,
}

// =============================================================================
// Sink / Counter Store Traits
// =============================================================================

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn write(&self, row: TelemetryRow) -> Result<()>;

    /// Server-side per-user token counter
    async fn increment_usage(&self, user_id: &UserId, tokens: u32) -> Result<()>;
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

#[async_trait]
impl TelemetrySink for NoopSink {
    async fn write(&self, _row: TelemetryRow) -> Result<()> {
        Ok(())
    }

    async fn increment_usage(&self, _user_id: &UserId, _tokens: u32) -> Result<()> {
        Ok(())
    }
}

/// Date-scoped call counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounter {
    pub date: String,
    pub count: u64,
}

/// Storage for the local daily counter.
///
/// `count`/`increment`/`reset` are read-then-write with no lock; concurrent
/// increments may be lost. The counter is advisory, the backend enforces limits.
#[async_trait]
pub trait UsageCounterStore: Send + Sync {
    async fn load(&self) -> Result<Option<UsageCounter>>;

    async fn save(&self, counter: UsageCounter) -> Result<()>;

    /// Count for `date`; zero if the stored counter belongs to another day
    async fn count(&self, date: &str) -> Result<u64> {
        Ok(match self.load().await? {
            Some(counter) if counter.date == date => counter.count,
            _ => 0,
        })
    }

    async fn increment(&self, date: &str) -> Result<u64> {
        let count = self.count(date).await? + 1;
        self.save(UsageCounter {
            date: date.to_string(),
            count,
        })
        .await?;
        Ok(count)
    }

    async fn reset(&self, date: &str) -> Result<()> {
        self.save(UsageCounter {
            date: date.to_string(),
            count: 0,
        })
        .await
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUsageStore {
    counter: Mutex<Option<UsageCounter>>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageCounterStore for InMemoryUsageStore {
    async fn load(&self) -> Result<Option<UsageCounter>> {
        Ok(self
            .counter
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    async fn save(&self, counter: UsageCounter) -> Result<()> {
        *self
            .counter
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(counter);
        Ok(())
    }
}

/// Local date in the counter's key format
pub fn today() -> String {
    chrono::Local::now().format(USAGE_DATE_FORMAT).to_string()
}

// =============================================================================
// Logger
// =============================================================================

pub struct TelemetryLogger {
    sink: Arc<dyn TelemetrySink>,
    usage_store: Arc<dyn UsageCounterStore>,
    session: Arc<dyn SessionProvider>,
    tracker: TaskTracker,
}

impl TelemetryLogger {
    pub fn new(
        sink: Arc<dyn TelemetrySink>,
        usage_store: Arc<dyn UsageCounterStore>,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            sink,
            usage_store,
            session,
            tracker: TaskTracker::new(),
        }
    }

    /// Logger that persists nothing
    pub fn disabled() -> Self {
        Self::new(
            Arc::new(NoopSink),
            Arc::new(InMemoryUsageStore::new()),
            Arc::new(AnonymousSession),
        )
    }

    /// Queue a record. Never blocks, never fails.
    pub fn record(&self, event: TelemetryEvent) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(
                    event_type = %event.event_type,
                    "No async runtime; dropping telemetry record"
                );
                return;
            }
        };

        let user_id = self.session.user_id();
        let count_usage =
            event.status == TelemetryStatus::Success && event.event_type.is_analysis();
        let tokens = event.total_tokens.filter(|_| count_usage);
        let row = Self::build_row(event, user_id.as_ref());

        let sink = Arc::clone(&self.sink);
        let usage_store = Arc::clone(&self.usage_store);

        self.tracker.spawn_on(
            async move {
                let event_type = row.event_type;
                if let Err(e) = sink.write(row).await {
                    warn!(event_type = %event_type, error = %e, "Telemetry write failed");
                }

                if !count_usage {
                    return;
                }

                match usage_store.increment(&today()).await {
                    Ok(count) => debug!(count, "Daily usage counter incremented"),
                    Err(e) => warn!(error = %e, "Daily usage counter update failed"),
                }

                if let (Some(user_id), Some(tokens)) = (user_id, tokens)
                    && let Err(e) = sink.increment_usage(&user_id, tokens).await
                {
                    debug!(error = %e, "Usage increment failed (ignored)");
                }
            },
            &handle,
        );
    }

    /// Wait for all queued writes to finish
    pub async fn flush(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Today's local usage count
    pub async fn usage_today(&self) -> Result<u64> {
        self.usage_store.count(&today()).await
    }

    fn build_row(event: TelemetryEvent, user_id: Option<&UserId>) -> TelemetryRow {
        TelemetryRow {
            user_id: user_id.map(|u| u.as_str().to_string()),
            event_type: event.event_type,
            model_name: event.model,
            prompt_text: redact_pii(&event.prompt),
            response_text: event.response.as_deref().map(redact_pii),
            latency_ms: event.latency.as_millis() as u64,
            status: event.status,
            error_message: event.error_message.as_deref().map(redact_pii),
            metadata: Value::Object(event.metadata),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::session::StaticSession;
    use crate::testing::RecordingSink;

    fn event(event_type: EventType, status: TelemetryStatus) -> TelemetryEvent {
        TelemetryEvent {
            event_type,
            model: ModelId::FlashLite,
            prompt: "Resume of jane.doe@example.com, (416) 555-1234".to_string(),
            response: Some("Reach me at jane.doe@example.com".to_string()),
            latency: Duration::from_millis(42),
            status,
            error_message: None,
            metadata: Map::new(),
            total_tokens: Some(120),
        }
    }

    fn logger(sink: Arc<RecordingSink>, store: Arc<InMemoryUsageStore>) -> TelemetryLogger {
        TelemetryLogger::new(sink, store, Arc::new(StaticSession::new("user-7")))
    }

    #[test]
    fn test_event_type_analysis_class() {
        assert!(EventType::JobExtraction.is_analysis());
        assert!(EventType::FitAnalysis.is_analysis());
        assert!(!EventType::Generation.is_analysis());
        assert!(!EventType::Critique.is_analysis());
        assert!(!EventType::VariantComparison.is_analysis());
    }

    #[tokio::test]
    async fn test_record_redacts_before_persisting() {
        let sink = Arc::new(RecordingSink::default());
        let logger = logger(sink.clone(), Arc::new(InMemoryUsageStore::new()));

        logger.record(event(EventType::JobExtraction, TelemetryStatus::Success));
        logger.flush().await;

        let rows = sink.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].prompt_text,
            "Resume of [REDACTED_EMAIL], [REDACTED_PHONE]"
        );
        assert_eq!(
            rows[0].response_text.as_deref(),
            Some("Reach me at [REDACTED_EMAIL]")
        );
        assert_eq!(rows[0].user_id.as_deref(), Some("user-7"));
        assert_eq!(rows[0].latency_ms, 42);
    }

    #[tokio::test]
    async fn test_successful_analysis_updates_counters() {
        let sink = Arc::new(RecordingSink::default());
        let store = Arc::new(InMemoryUsageStore::new());
        let logger = logger(sink.clone(), store.clone());

        logger.record(event(EventType::FitAnalysis, TelemetryStatus::Success));
        logger.flush().await;

        assert_eq!(logger.usage_today().await.unwrap(), 1);
        assert_eq!(sink.usage_increments(), vec![("user-7".to_string(), 120)]);
    }

    #[tokio::test]
    async fn test_generation_and_errors_do_not_count() {
        let sink = Arc::new(RecordingSink::default());
        let store = Arc::new(InMemoryUsageStore::new());
        let logger = logger(sink.clone(), store.clone());

        logger.record(event(EventType::Generation, TelemetryStatus::Success));
        logger.record(event(EventType::JobExtraction, TelemetryStatus::Error));
        logger.flush().await;

        assert_eq!(sink.rows().len(), 2);
        assert_eq!(logger.usage_today().await.unwrap(), 0);
        assert!(sink.usage_increments().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failures_are_swallowed() {
        let sink = Arc::new(RecordingSink::failing());
        let logger = logger(sink.clone(), Arc::new(InMemoryUsageStore::new()));

        logger.record(event(EventType::JobExtraction, TelemetryStatus::Success));
        logger.flush().await;

        // The write failed but the local counter still moved
        assert_eq!(logger.usage_today().await.unwrap(), 1);
    }

    #[test]
    fn test_record_without_runtime_is_dropped() {
        let sink = Arc::new(RecordingSink::default());
        let logger = logger(sink.clone(), Arc::new(InMemoryUsageStore::new()));
        logger.record(event(EventType::Generation, TelemetryStatus::Success));
        assert!(sink.rows().is_empty());
    }

    #[tokio::test]
    async fn test_usage_counter_resets_on_new_date() {
        let store = InMemoryUsageStore::new();
        assert_eq!(store.increment("2026-01-01").await.unwrap(), 1);
        assert_eq!(store.increment("2026-01-01").await.unwrap(), 2);
        assert_eq!(store.count("2026-01-02").await.unwrap(), 0);
        assert_eq!(store.increment("2026-01-02").await.unwrap(), 1);

        store.reset("2026-01-02").await.unwrap();
        assert_eq!(store.count("2026-01-02").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_noop_sink() {
        let row = TelemetryLogger::build_row(
            event(EventType::Critique, TelemetryStatus::Success),
            None,
        );
        assert!(row.user_id.is_none());
        NoopSink.write(row).await.unwrap();
    }
}
