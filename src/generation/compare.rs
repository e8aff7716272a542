//! Side-by-side variant comparison
//!
//! Generates one draft per requested variant concurrently, with no critique.
//! Every branch settles before the call returns; one failure never cancels
//! its siblings.

use futures::future::join_all;

use super::{GenerationRequest, QualityGateGenerator, Variant};
use crate::ai::retry::CallOptions;
use crate::ai::telemetry::EventType;
use crate::types::Result;

/// One branch of a comparison
#[derive(Debug)]
pub struct VariantOutput {
    pub variant: Variant,
    pub result: Result<String>,
}

impl VariantOutput {
    pub fn text(&self) -> Option<&str> {
        self.result.as_deref().ok()
    }
}

impl QualityGateGenerator {
    /// One output per entry of `variants`, in the same order
    pub async fn compare_variants(
        &self,
        request: &GenerationRequest,
        variants: &[Variant],
        options: &CallOptions,
    ) -> Vec<VariantOutput> {
        tracing::info!(
            "Comparison: Generating {} {} variants concurrently",
            variants.len(),
            request.kind
        );

        let branches = variants.iter().map(|&variant| async move {
            let result = self
                .generate_text(request, variant, EventType::VariantComparison, options)
                .await;
            if let Err(e) = &result {
                tracing::warn!(%variant, error = %e, "Comparison: Variant failed");
            }
            VariantOutput { variant, result }
        });

        join_all(branches).await
    }
}
