//! Quality-Gated Generation
//!
//! Bounded generate/critique loop. Each attempt generates a draft in a fresh
//! style [`Variant`], scores it with a critique call, and then:
//!
//! - stops when the score clears the threshold
//! - stops with the current draft when it scored lower than the previous one
//! - on the final attempt, returns the best-scoring draft seen
//!
//! Attempts run strictly in sequence. Generation and critique calls are
//! retried independently by the executor; a call that still fails aborts the
//! run.

mod compare;
pub mod critique;
mod variants;

pub use compare::VariantOutput;
pub use critique::{CritiqueDecision, CritiqueResult};
pub use variants::{Variant, pick_variant, select_variant};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ai::client::LlmClient;
use crate::ai::model::{GenerationConfig, InvocationRequest, ModelId};
use crate::ai::prompt::PromptTemplates;
use crate::ai::retry::{CallOptions, InvocationContext};
use crate::ai::telemetry::EventType;
use crate::config::{ModelsConfig, QualityConfig};
use crate::constants::quality as quality_constants;
use crate::types::{JobfitError, Result, ValidationError};

/// What the quality gate writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    CoverLetter,
    ResumeSummary,
    OutreachMessage,
}

impl ArtifactKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CoverLetter => "cover letter",
            Self::ResumeSummary => "resume summary",
            Self::OutreachMessage => "outreach message",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub kind: ArtifactKind,
    /// Task description plus job and candidate context
    pub prompt: String,
    /// Style for the first attempt; later attempts still rotate
    pub forced_variant: Option<Variant>,
    /// Overrides the configured generation temperature
    pub temperature: Option<f32>,
    /// Overrides the configured attempt budget
    pub max_attempts: Option<u32>,
    /// Overrides the configured pass score
    pub threshold: Option<u8>,
}

impl GenerationRequest {
    pub fn new(kind: ArtifactKind, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            forced_variant: None,
            temperature: None,
            max_attempts: None,
            threshold: None,
        }
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.forced_variant = Some(variant);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = Some(threshold.min(100));
        self
    }
}

/// One scored draft; lives only for the duration of a run
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationAttempt {
    pub text: String,
    pub variant: Variant,
    pub score: u8,
    pub critique: CritiqueResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub text: String,
    pub variant_used: Variant,
    pub score: u8,
    pub attempts_taken: u32,
    /// Critique of the returned draft
    pub critique: CritiqueResult,
}

impl GenerationResult {
    fn from_attempt(attempt: GenerationAttempt, attempts_taken: u32) -> Self {
        Self {
            text: attempt.text,
            variant_used: attempt.variant,
            score: attempt.score,
            attempts_taken,
            critique: attempt.critique,
        }
    }
}

pub struct QualityGateGenerator {
    client: LlmClient,
    generation_model: ModelId,
    critique_model: ModelId,
    max_attempts: u32,
    threshold: u8,
    temperature: f32,
    variants: Vec<Variant>,
}

impl QualityGateGenerator {
    pub fn new(client: LlmClient, models: &ModelsConfig, quality: &QualityConfig) -> Self {
        Self {
            client,
            generation_model: models.generation,
            critique_model: models.critique,
            max_attempts: quality.max_attempts.max(1),
            threshold: quality.threshold,
            temperature: quality.temperature,
            variants: Variant::ALL.to_vec(),
        }
    }

    /// Restrict the styles the loop rotates through
    pub fn with_variants(mut self, variants: Vec<Variant>) -> Self {
        self.variants = variants;
        self
    }

    pub async fn run(
        &self,
        request: &GenerationRequest,
        options: &CallOptions,
    ) -> Result<GenerationResult> {
        let max_attempts = request.max_attempts.unwrap_or(self.max_attempts).max(1);
        let threshold = request.threshold.unwrap_or(self.threshold);
        let mut attempts: Vec<GenerationAttempt> = Vec::new();
        let mut used: Vec<Variant> = Vec::new();

        tracing::info!(
            "Quality gate: Generating {} (max_attempts={}, threshold={})",
            request.kind,
            max_attempts,
            threshold
        );

        for attempt in 1..=max_attempts {
            let variant = match request.forced_variant {
                Some(forced) if attempt == 1 => forced,
                _ => pick_variant(&self.variants, &used).ok_or_else(|| {
                    JobfitError::Config("no generation variants configured".to_string())
                })?,
            };
            used.push(variant);

            let text = self
                .generate_text(request, variant, EventType::Generation, options)
                .await?;
            let critique = self.critique(request, &text, options).await?;
            let score = critique.score;

            if let Some(progress) = &options.progress {
                progress.attempt_scored(attempt, variant, score);
            }
            tracing::info!(
                attempt,
                %variant,
                score,
                threshold,
                "Quality gate: Attempt scored"
            );

            let previous = attempts.last().map(|a| a.score);
            let current = GenerationAttempt {
                text,
                variant,
                score,
                critique,
            };

            if score >= threshold {
                return Ok(GenerationResult::from_attempt(current, attempt));
            }

            let regressed = previous.is_some_and(|prev| score < prev);
            if regressed && attempt < max_attempts {
                tracing::info!(
                    "Quality gate: Score regressed ({} < {}), stopping at attempt {}",
                    score,
                    previous.unwrap_or_default(),
                    attempt
                );
                return Ok(GenerationResult::from_attempt(current, attempt));
            }

            attempts.push(current);
        }

        let attempts_taken = attempts.len() as u32;
        let best = best_attempt(attempts).ok_or_else(|| {
            JobfitError::Config("quality gate ran zero attempts".to_string())
        })?;

        tracing::info!(
            "Quality gate: Threshold not met, returning best score {} ({})",
            best.score,
            best.variant
        );
        Ok(GenerationResult::from_attempt(best, attempts_taken))
    }

    /// One retried generation call in `variant`'s style
    async fn generate_text(
        &self,
        request: &GenerationRequest,
        variant: Variant,
        event_type: EventType,
        options: &CallOptions,
    ) -> Result<String> {
        let prompt = PromptTemplates::generation(request.kind, &request.prompt, variant);
        let config = GenerationConfig::default()
            .with_temperature(request.temperature.unwrap_or(self.temperature))
            .with_max_output_tokens(quality_constants::MAX_OUTPUT_TOKENS);
        let invocation = InvocationRequest::new(self.generation_model, prompt.clone(), config);
        let context = InvocationContext::new(event_type, self.generation_model, prompt)
            .with_metadata("artifact", request.kind.label())
            .with_metadata("variant", variant.label());

        self.client
            .generate(&invocation, context, options, |text| {
                let text = text.trim();
                if text.is_empty() {
                    return Err(ValidationError::empty_response("generation").into());
                }
                Ok(text.to_string())
            })
            .await
    }

    async fn critique(
        &self,
        request: &GenerationRequest,
        draft: &str,
        options: &CallOptions,
    ) -> Result<CritiqueResult> {
        let prompt = PromptTemplates::critique(request.kind, &request.prompt, draft);
        let config = GenerationConfig::structured(critique::schema())
            .with_temperature(quality_constants::CRITIQUE_TEMPERATURE);
        let invocation = InvocationRequest::new(self.critique_model, prompt.clone(), config);
        let context = InvocationContext::new(EventType::Critique, self.critique_model, prompt)
            .with_metadata("artifact", request.kind.label());

        self.client
            .generate(&invocation, context, options, critique::parse_critique)
            .await
    }
}

/// Highest score; ties go to the earliest attempt
fn best_attempt(attempts: Vec<GenerationAttempt>) -> Option<GenerationAttempt> {
    attempts
        .into_iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.score.cmp(&b.score).then(ib.cmp(ia)))
        .map(|(_, attempt)| attempt)
}
