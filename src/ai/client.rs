//! Retried, logged LLM calls
//!
//! [`LlmClient`] ties the gateway to the retry executor: every call resolves
//! an invoker for the request's model, runs it under the retry policy, and
//! parses the response inside the retried closure so parse and validation
//! failures are logged and translated exactly once.

use std::sync::Arc;

use crate::ai::gateway::SharedResolver;
use crate::ai::model::InvocationRequest;
use crate::ai::retry::{CallOptions, InvocationContext, RetryExecutor, RetryPolicy};
use crate::types::Result;

#[derive(Clone)]
pub struct LlmClient {
    resolver: SharedResolver,
    executor: Arc<RetryExecutor>,
    policy: RetryPolicy,
}

impl LlmClient {
    pub fn new(
        resolver: SharedResolver,
        executor: Arc<RetryExecutor>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            resolver,
            executor,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn executor(&self) -> &Arc<RetryExecutor> {
        &self.executor
    }

    /// Invoke `request` and parse the response text with `parse`
    pub async fn generate<T, P>(
        &self,
        request: &InvocationRequest,
        context: InvocationContext,
        options: &CallOptions,
        parse: P,
    ) -> Result<T>
    where
        P: Fn(&str) -> Result<T>,
    {
        let parse = &parse;
        self.executor
            .execute(&context, &self.policy, options, |metadata| {
                let resolver = Arc::clone(&self.resolver);
                async move {
                    let invoker =
                        resolver.resolve(request.model, request.generation_config.clone())?;
                    let response = invoker.generate_content(&request.contents).await?;

                    metadata.insert("path", invoker.path().to_string());
                    if let Some(usage) = response.usage {
                        metadata.record_usage(usage);
                    }
                    metadata.set_response_text(response.text.clone());

                    parse(&response.text)
                }
            })
            .await
    }

    /// Invoke `request` and return the raw response text
    pub async fn generate_text(
        &self,
        request: &InvocationRequest,
        context: InvocationContext,
        options: &CallOptions,
    ) -> Result<String> {
        self.generate(request, context, options, |text| Ok(text.to_string()))
            .await
    }
}
