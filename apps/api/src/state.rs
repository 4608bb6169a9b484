use std::sync::Arc;

use crate::ai::provider::AiProvider;
use crate::usage::gate::UsageGate;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Quota, dedup and cache policy applied around every billable AI call.
    pub gate: Arc<UsageGate>,
    /// Pluggable AI backend. Default: `LlmProvider` over the Anthropic client.
    pub provider: Arc<dyn AiProvider>,
}
