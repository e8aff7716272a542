//! Jobfit - AI Request Orchestration for Job-Fit Analysis
//!
//! The layer between an application and a remote LLM service: a staged
//! analysis pipeline, a retry executor with quota-aware backoff, and a
//! quality-gated generation loop.
//!
//! ## Core Features
//!
//! - **Model Gateway**: direct (caller-supplied key) or relay invocation behind one interface
//! - **Retry Executor**: exponential backoff for rate limits, fail-fast for everything else
//! - **Telemetry**: fire-and-forget invocation log with PII redaction
//! - **Staged Analysis**: cheap extraction first, expensive fit comparison only when needed
//! - **Quality Gate**: generate, critique, and stop or diversify
//!
//! ## Quick Start
//!
//! ```ignore
//! use jobfit::{CallOptions, ConfigLoader, Orchestrator};
//! use jobfit::ai::{AnonymousSession, NoCredentials};
//! use jobfit::analysis::AnalysisRequest;
//!
//! let config = ConfigLoader::load()?;
//! let core = Orchestrator::from_config(config, Arc::new(NoCredentials), Arc::new(AnonymousSession))?;
//! let analysis = core
//!     .analyze(&AnalysisRequest::new(posting).with_profiles(profiles), &CallOptions::new())
//!     .await?;
//! if let Some(score) = analysis.compatibility_score() {
//!     println!("fit: {score}");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: gateway, retry executor, telemetry, prompts
//! - [`analysis`]: two-stage extraction and fit comparison
//! - [`generation`]: quality gate, variants, side-by-side comparison
//! - [`storage`]: SQLite telemetry and usage counters
//! - [`config`]: layered configuration

pub mod ai;
pub mod analysis;
pub mod config;
pub mod constants;
pub mod generation;
pub mod logging;
pub mod orchestrator;
pub mod storage;
pub mod types;

#[cfg(test)]
mod testing;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};
pub use orchestrator::Orchestrator;
pub use types::{ErrorCategory, JobfitError, Result};

pub use ai::{
    CallOptions, EventType, InvocationContext, LlmClient, ModelGateway, ModelId, ProgressEvent,
    ProgressReporter, RetryExecutor, RetryPolicy, TelemetryLogger,
};
pub use analysis::{AnalysisPipeline, AnalysisRequest};
pub use generation::{
    ArtifactKind, GenerationRequest, GenerationResult, QualityGateGenerator, Variant,
};
pub use storage::{Database, SharedDatabase};
pub use types::{CandidateProfile, DistilledJob, FitAnalysis, JobAnalysis};
