use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::state::AppState;
use crate::usage::gate::UsageStats;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub removed: u64,
}

/// GET /api/v1/usage/stats
pub async fn handle_usage_stats(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<UsageStats>, AppError> {
    let stats = state.gate.usage_stats(&params.user_id).await?;
    Ok(Json(stats))
}

/// POST /api/v1/admin/cache/purge
///
/// Deletes expired cache rows. Only reclaims space; expired rows are already
/// ignored on read.
pub async fn handle_purge_cache(
    State(state): State<AppState>,
) -> Result<Json<PurgeResponse>, AppError> {
    let removed = state.gate.purge_expired_cache().await?;
    Ok(Json(PurgeResponse { removed }))
}
