//! Database Layer with Connection Pooling
//!
//! SQLite persistence for invocation telemetry and usage counters:
//! - Connection pooling via r2d2
//! - WAL mode so background telemetry writes never block readers
//! - Schema version tracked in `user_version`
//!
//! All methods are blocking. The async trait impls move them onto the
//! blocking pool with `spawn_blocking`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use crate::ai::model::ModelId;
use crate::ai::telemetry::{
    EventType, TelemetryRow, TelemetrySink, TelemetryStatus, UsageCounter, UsageCounterStore,
};
use crate::types::{JobfitError, Result, ResultExt, UserId};

/// Shared database handle for async contexts.
pub type SharedDatabase = Arc<Database>;

const SCHEMA: &str = include_str!("schema.sql");

/// Current schema version
const SCHEMA_VERSION: u32 = 1;

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_size: u32,
    pub min_idle: u32,
    /// Timeout for acquiring a connection (seconds)
    pub connection_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 4,
            min_idle: 1,
            connection_timeout_secs: 30,
        }
    }
}

/// Persisted telemetry row with its storage identity
#[derive(Debug, Clone)]
pub struct StoredTelemetry {
    pub id: String,
    pub created_at: String,
    pub row: TelemetryRow,
}

/// Per-user token totals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUsage {
    pub user_id: String,
    pub tokens: u64,
    pub calls: u64,
}

/// Thread-safe database with connection pooling.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open (creating parent directories) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, PoolConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(path: P, config: PoolConfig) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let manager =
            SqliteConnectionManager::file(path.as_ref()).with_init(Self::configure_connection);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .min_idle(Some(config.min_idle))
            .connection_timeout(std::time::Duration::from_secs(
                config.connection_timeout_secs,
            ))
            .build(manager)
            .with_context_fn(|| {
                format!(
                    "Failed to create connection pool for {}",
                    path.as_ref().display()
                )
            })?;

        Ok(Self { pool })
    }

    /// Single-connection in-memory database for tests.
    pub fn open_in_memory() -> Result<Self> {
        let pool = Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())
            .with_context("Failed to create in-memory pool")?;

        Ok(Self { pool })
    }

    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA wal_autocheckpoint = 1000;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| {
            JobfitError::Storage(format!("Failed to acquire database connection: {}", e))
        })
    }

    /// Create tables and stamp the schema version.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)
            .with_context("Failed to initialize database schema")?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .with_context("Failed to set schema version")?;
        Ok(())
    }

    pub fn schema_version(&self) -> Result<u32> {
        let version = self
            .conn()?
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        Ok(version)
    }

    // =========================================================================
    // Telemetry
    // =========================================================================

    /// Insert one telemetry row, returning its id.
    pub fn insert_telemetry(&self, row: &TelemetryRow) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let metadata = serde_json::to_string(&row.metadata)?;

        self.conn()?
            .execute(
                "INSERT INTO ai_telemetry
                 (id, user_id, event_type, model_name, prompt_text, response_text,
                  latency_ms, status, error_message, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    id,
                    row.user_id,
                    row.event_type.as_str(),
                    row.model_name.as_str(),
                    row.prompt_text,
                    row.response_text,
                    row.latency_ms as i64,
                    row.status.as_str(),
                    row.error_message,
                    metadata,
                    now,
                ],
            )
            .with_context("Failed to insert telemetry row")?;

        tracing::debug!(
            "Stored telemetry: event={}, status={}",
            row.event_type,
            row.status.as_str()
        );
        Ok(id)
    }

    /// Newest rows first.
    pub fn recent_telemetry(&self, limit: usize) -> Result<Vec<StoredTelemetry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, created_at, user_id, event_type, model_name, prompt_text, response_text,
                    latency_ms, status, error_message, metadata
             FROM ai_telemetry
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1",
        )?;

        let raw_rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(RawTelemetry {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    user_id: row.get(2)?,
                    event_type: row.get(3)?,
                    model_name: row.get(4)?,
                    prompt_text: row.get(5)?,
                    response_text: row.get(6)?,
                    latency_ms: row.get(7)?,
                    status: row.get(8)?,
                    error_message: row.get(9)?,
                    metadata: row.get(10)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        raw_rows.into_iter().map(RawTelemetry::decode).collect()
    }

    // =========================================================================
    // Usage Counters
    // =========================================================================

    /// Add `tokens` to the user's running total.
    pub fn add_usage(&self, user_id: &str, tokens: u32) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn()?
            .execute(
                "INSERT INTO usage_counters (user_id, tokens, calls, updated_at)
                 VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET
                    tokens = tokens + excluded.tokens,
                    calls = calls + 1,
                    updated_at = excluded.updated_at",
                params![user_id, tokens as i64, now],
            )
            .with_context("Failed to update usage counter")?;
        Ok(())
    }

    pub fn usage_for(&self, user_id: &str) -> Result<Option<UserUsage>> {
        let usage = self
            .conn()?
            .query_row(
                "SELECT user_id, tokens, calls FROM usage_counters WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(UserUsage {
                        user_id: row.get(0)?,
                        tokens: row.get::<_, i64>(1)? as u64,
                        calls: row.get::<_, i64>(2)? as u64,
                    })
                },
            )
            .optional()?;
        Ok(usage)
    }

    pub fn load_daily_usage(&self) -> Result<Option<UsageCounter>> {
        let counter = self
            .conn()?
            .query_row("SELECT date, count FROM daily_usage WHERE id = 1", [], |row| {
                Ok(UsageCounter {
                    date: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })
            .optional()?;
        Ok(counter)
    }

    pub fn save_daily_usage(&self, counter: &UsageCounter) -> Result<()> {
        self.conn()?
            .execute(
                "INSERT INTO daily_usage (id, date, count) VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET date = excluded.date, count = excluded.count",
                params![counter.date, counter.count as i64],
            )
            .with_context("Failed to save daily usage")?;
        Ok(())
    }

    /// Run a blocking database call on the blocking pool
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| JobfitError::Storage(format!("Database task failed: {}", e)))?
    }
}

/// Column values before decoding into typed fields
struct RawTelemetry {
    id: String,
    created_at: String,
    user_id: Option<String>,
    event_type: String,
    model_name: String,
    prompt_text: String,
    response_text: Option<String>,
    latency_ms: i64,
    status: String,
    error_message: Option<String>,
    metadata: String,
}

impl RawTelemetry {
    fn decode(self) -> Result<StoredTelemetry> {
        let event_type: EventType = serde_json::from_value(Value::String(self.event_type))?;
        let status: TelemetryStatus = serde_json::from_value(Value::String(self.status))?;
        let model_name: ModelId = self.model_name.parse().map_err(JobfitError::Storage)?;
        let metadata: Value = serde_json::from_str(&self.metadata)?;

        Ok(StoredTelemetry {
            id: self.id,
            created_at: self.created_at,
            row: TelemetryRow {
                user_id: self.user_id,
                event_type,
                model_name,
                prompt_text: self.prompt_text,
                response_text: self.response_text,
                latency_ms: self.latency_ms.max(0) as u64,
                status,
                error_message: self.error_message,
                metadata,
            },
        })
    }
}

#[async_trait]
impl TelemetrySink for Database {
    async fn write(&self, row: TelemetryRow) -> Result<()> {
        self.blocking(move |db| db.insert_telemetry(&row).map(|_| ()))
            .await
    }

    async fn increment_usage(&self, user_id: &UserId, tokens: u32) -> Result<()> {
        let user_id = user_id.as_str().to_string();
        self.blocking(move |db| db.add_usage(&user_id, tokens)).await
    }
}

#[async_trait]
impl UsageCounterStore for Database {
    async fn load(&self) -> Result<Option<UsageCounter>> {
        self.blocking(|db| db.load_daily_usage()).await
    }

    async fn save(&self, counter: UsageCounter) -> Result<()> {
        self.blocking(move |db| db.save_daily_usage(&counter)).await
    }
}
