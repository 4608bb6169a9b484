//! AI provider — pluggable, trait-based backend that performs one operation.
//!
//! Default: `LlmProvider` over the Anthropic client.
//! `AppState` holds an `Arc<dyn AiProvider>`; tests swap in scripted fakes.

use async_trait::async_trait;
use serde_json::Value;

use crate::ai::prompts::{build_prompt, JSON_ONLY_SYSTEM};
use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::usage::operation::OperationInput;

/// Result of a provider call: the JSON output plus the tokens it consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderOutput {
    pub output: Value,
    pub tokens_used: i32,
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn run(&self, input: &OperationInput) -> Result<ProviderOutput, AppError>;
}

pub struct LlmProvider(pub LlmClient);

#[async_trait]
impl AiProvider for LlmProvider {
    async fn run(&self, input: &OperationInput) -> Result<ProviderOutput, AppError> {
        let prompt = build_prompt(input);
        let (output, usage) = self
            .0
            .call_json::<Value>(&prompt, JSON_ONLY_SYSTEM)
            .await
            .map_err(|e| {
                AppError::Llm(format!("{} call failed: {e}", input.operation_type()))
            })?;

        Ok(ProviderOutput {
            output,
            tokens_used: i32::try_from(usage.total()).unwrap_or(i32::MAX),
        })
    }
}
