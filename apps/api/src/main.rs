mod ai;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;
mod usage;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai::provider::LlmProvider;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::usage::clock::SystemClock;
use crate::usage::gate::UsageGate;
use crate::usage::postgres::{PgAuditLog, PgCreditStore, PgResultCache};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting usage gate API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Usage gate over the Postgres stores
    let gate = UsageGate::new(
        Arc::new(PgCreditStore::new(db.clone())),
        Arc::new(PgResultCache::new(db.clone())),
        Arc::new(PgAuditLog::new(db)),
        Arc::new(SystemClock),
        config.gate.clone(),
    );
    info!(
        "Usage gate initialized (free plan: {}/day, cache ttl: {}h, {} unlimited principals)",
        config.gate.free_limits.daily,
        config.gate.cache_ttl_hours,
        config.gate.unlimited_user_ids.len()
    );

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Build app state
    let state = AppState {
        gate: Arc::new(gate),
        provider: Arc::new(LlmProvider(llm)),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
