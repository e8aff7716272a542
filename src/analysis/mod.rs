//! Staged Analysis Pipeline
//!
//! Two stages, cheapest first:
//!
//! 1. **Extraction**: a low-cost model distills the raw posting into a
//!    [`DistilledJob`] plus a cleaned description.
//! 2. **Fit comparison**: only when at least one candidate profile is
//!    supplied, a higher-cost model scores the cleaned description against
//!    the profiles.
//!
//! Without profiles the result carries no fit, and callers must check
//! [`JobAnalysis::compatibility_score`] before reading fit fields.

pub mod schemas;

use serde::Deserialize;

use crate::ai::client::LlmClient;
use crate::ai::json::{normalize_score, parse_value, require_fields};
use crate::ai::model::{GenerationConfig, InvocationRequest, ModelId};
use crate::ai::prompt::PromptTemplates;
use crate::ai::retry::{CallOptions, InvocationContext};
use crate::ai::telemetry::EventType;
use crate::config::{ModelsConfig, PipelineConfig};
use crate::constants::pipeline as pipeline_constants;
use crate::types::{
    CandidateProfile, DistilledJob, FitAnalysis, JobAnalysis, Result, SkillEvidence,
    ValidationError, ValidationErrorKind,
};

const EXTRACTION_LABEL: &str = "Extracting job details";
const COMPARISON_LABEL: &str = "Comparing against your profiles";

/// Stage 1 response shape
#[derive(Debug, Deserialize)]
struct Extraction {
    job: DistilledJob,
    cleaned_description: String,
}

/// Input to one pipeline run
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub raw_text: String,
    pub profiles: Vec<CandidateProfile>,
    pub evidence: Vec<SkillEvidence>,
}

impl AnalysisRequest {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            ..Default::default()
        }
    }

    pub fn with_profiles(mut self, profiles: Vec<CandidateProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn with_evidence(mut self, evidence: Vec<SkillEvidence>) -> Self {
        self.evidence = evidence;
        self
    }
}

pub struct AnalysisPipeline {
    client: LlmClient,
    extraction_model: ModelId,
    analysis_model: ModelId,
    max_input_chars: usize,
}

impl AnalysisPipeline {
    pub fn new(client: LlmClient, models: &ModelsConfig, pipeline: &PipelineConfig) -> Self {
        Self {
            client,
            extraction_model: models.extraction,
            analysis_model: models.analysis,
            max_input_chars: pipeline.max_input_chars,
        }
    }

    /// Run extraction, then fit comparison when profiles were supplied
    pub async fn run(
        &self,
        request: &AnalysisRequest,
        options: &CallOptions,
    ) -> Result<JobAnalysis> {
        if request.raw_text.trim().is_empty() {
            return Err(ValidationError::new(
                ValidationErrorKind::General,
                "job description is empty",
            )
            .with_field("raw_text")
            .into());
        }

        let total_steps = if request.profiles.is_empty() { 1 } else { 2 };

        if let Some(progress) = &options.progress {
            progress.stage_started(EXTRACTION_LABEL, 1, total_steps);
        }
        let extraction = self.extract(&request.raw_text, options).await?;

        if request.profiles.is_empty() {
            tracing::info!("Analysis: No profiles supplied, skipping fit comparison");
            return Ok(JobAnalysis {
                job: extraction.job,
                cleaned_description: extraction.cleaned_description,
                fit: None,
            });
        }

        if let Some(progress) = &options.progress {
            progress.stage_started(COMPARISON_LABEL, 2, total_steps);
        }
        let fit = self
            .compare(
                &extraction.cleaned_description,
                &request.profiles,
                &request.evidence,
                options,
            )
            .await?;

        tracing::info!(
            "Analysis: {} scored {} against profile '{}'",
            extraction.job.title,
            fit.compatibility_score,
            fit.best_profile_id
        );

        Ok(JobAnalysis {
            job: extraction.job,
            cleaned_description: extraction.cleaned_description,
            fit: Some(fit),
        })
    }

    async fn extract(&self, raw_text: &str, options: &CallOptions) -> Result<Extraction> {
        let input = truncate_chars(raw_text, self.max_input_chars);
        let truncated = input.len() < raw_text.len();
        if truncated {
            tracing::debug!(
                limit = self.max_input_chars,
                "Analysis: Posting truncated before extraction"
            );
        }

        let prompt = PromptTemplates::job_extraction(input);
        let config = GenerationConfig::structured(schemas::extraction())
            .with_temperature(pipeline_constants::EXTRACTION_TEMPERATURE);
        let invocation = InvocationRequest::new(self.extraction_model, prompt.clone(), config);
        let context =
            InvocationContext::new(EventType::JobExtraction, self.extraction_model, prompt)
                .with_metadata("input_chars", input.chars().count())
                .with_metadata("truncated", truncated);

        self.client
            .generate(&invocation, context, options, parse_extraction)
            .await
    }

    async fn compare(
        &self,
        cleaned_description: &str,
        profiles: &[CandidateProfile],
        evidence: &[SkillEvidence],
        options: &CallOptions,
    ) -> Result<FitAnalysis> {
        let prompt = PromptTemplates::fit_comparison(cleaned_description, profiles, evidence);
        let config = GenerationConfig::structured(schemas::fit_analysis())
            .with_temperature(pipeline_constants::ANALYSIS_TEMPERATURE);
        let invocation = InvocationRequest::new(self.analysis_model, prompt.clone(), config);
        let context = InvocationContext::new(EventType::FitAnalysis, self.analysis_model, prompt)
            .with_metadata("profile_count", profiles.len())
            .with_metadata("evidence_count", evidence.len());

        let fit = self
            .client
            .generate(&invocation, context, options, parse_fit)
            .await?;

        if !profiles.iter().any(|p| p.id == fit.best_profile_id) {
            tracing::warn!(
                best_profile_id = %fit.best_profile_id,
                "Analysis: Best profile id does not match any supplied profile"
            );
        }

        Ok(fit)
    }
}

fn parse_extraction(text: &str) -> Result<Extraction> {
    let value = parse_value(text, "job extraction")?;
    require_fields(&value, &["job", "cleaned_description"])?;
    Ok(serde_json::from_value(value)?)
}

fn parse_fit(text: &str) -> Result<FitAnalysis> {
    let mut value = parse_value(text, "fit analysis")?;
    require_fields(&value, &["compatibility_score", "best_profile_id"])?;

    normalize_score(&mut value, "compatibility_score")?;

    let best = value["best_profile_id"].as_str().unwrap_or_default().trim();
    if best.is_empty() {
        return Err(
            ValidationError::new(ValidationErrorKind::MissingField, "best profile id is empty")
                .with_field("best_profile_id")
                .into(),
        );
    }

    Ok(serde_json::from_value(value)?)
}

/// Longest prefix of at most `max_chars` characters
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
