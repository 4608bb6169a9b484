pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::ai::handlers as ai_handlers;
use crate::state::AppState;
use crate::usage::handlers as usage_handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Gated AI operations
        .route("/api/v1/ai/run", post(ai_handlers::handle_run))
        // Usage reporting
        .route("/api/v1/usage/stats", get(usage_handlers::handle_usage_stats))
        // Housekeeping
        .route(
            "/api/v1/admin/cache/purge",
            post(usage_handlers::handle_purge_cache),
        )
        .with_state(state)
}
