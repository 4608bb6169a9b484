//! Axum route handlers for gated AI operations.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::ai::provider::AiProvider;
use crate::errors::AppError;
use crate::state::AppState;
use crate::usage::gate::{CommitParams, GateDecision, UsageGate};
use crate::usage::operation::{OperationInput, OperationType};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub user_id: String,
    pub operation: OperationInput,
    #[serde(default)]
    pub force_refresh: bool,
}

/// Same shape for cached and fresh results. `cached` is provenance only.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub operation_type: OperationType,
    pub output: Value,
    pub cached: bool,
    pub credits_remaining: i32,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/ai/run
///
/// Validates the input, checks quota and cache, and only calls the provider
/// when the gate asks for a fresh computation.
pub async fn handle_run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunResponse>, AppError> {
    let response = run_gated(
        &state.gate,
        state.provider.as_ref(),
        &request.user_id,
        &request.operation,
        request.force_refresh,
    )
    .await?;
    Ok(Json(response))
}

/// Runs one operation behind the usage gate.
///
/// A provider failure is recorded with `fail` (no debit, no cache write) and
/// then returned to the caller.
pub async fn run_gated(
    gate: &UsageGate,
    provider: &dyn AiProvider,
    user_id: &str,
    input: &OperationInput,
    force_refresh: bool,
) -> Result<RunResponse, AppError> {
    input.validate()?;
    let operation = input.operation_type();

    match gate.evaluate(user_id, input, force_refresh).await? {
        GateDecision::Blocked { daily_limit } => {
            info!("Rejecting {operation} for {user_id}: daily limit reached");
            Err(AppError::QuotaExceeded { daily_limit })
        }
        GateDecision::Cached {
            output,
            credits_remaining,
        } => Ok(RunResponse {
            operation_type: operation,
            output,
            cached: true,
            credits_remaining,
        }),
        GateDecision::Fresh {
            request_hash,
            credits_remaining,
        } => match provider.run(input).await {
            Ok(result) => {
                let input_data = input.input_data();
                gate.commit(CommitParams {
                    user_id,
                    operation,
                    request_hash: &request_hash,
                    input_data: Some(&input_data),
                    output: &result.output,
                    tokens_used: result.tokens_used,
                    force_refresh,
                })
                .await?;
                Ok(RunResponse {
                    operation_type: operation,
                    output: result.output,
                    cached: false,
                    credits_remaining,
                })
            }
            Err(e) => {
                gate.fail(user_id, operation, &request_hash, &e.to_string())
                    .await?;
                Err(e)
            }
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
