mod analysis;
mod auth;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;
mod storage;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::normalizer::HttpPageFetcher;
use crate::analysis::pipeline::Analyzer;
use crate::auth::SessionKeys;
use crate::config::{Config, StorageBackend};
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{HistoryStore, MemoryStore, PgStore, UserStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; missing required env vars abort startup
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting newscheck v{}", env!("CARGO_PKG_VERSION"));

    let (history, users) = build_storage(&config).await?;

    // Initialize LLM client
    let llm = LlmClient::new(
        config.model_endpoint.clone(),
        config.model_id.clone(),
        config.hf_token.clone(),
        Duration::from_secs(config.model_timeout_secs),
    )?;
    info!("LLM client initialized (model: {})", llm.model());

    let fetcher = HttpPageFetcher::new(Duration::from_secs(config.fetch_timeout_secs))
        .context("failed to build the article fetcher")?;

    let analyzer = Analyzer::new(
        Arc::new(llm),
        Arc::new(fetcher),
        history.clone(),
        config.max_article_chars,
    );

    // Build app state
    let state = AppState {
        analyzer: Arc::new(analyzer),
        history,
        users,
        sessions: SessionKeys::new(&config.jwt_secret, config.session_ttl_hours),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Opens the configured store. Both handles point at the same backend.
async fn build_storage(config: &Config) -> Result<(Arc<dyn HistoryStore>, Arc<dyn UserStore>)> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;
            let store = Arc::new(PgStore::new(create_pool(url).await?));
            Ok((store.clone(), store))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; users and history are lost on restart");
            let store = Arc::new(MemoryStore::new());
            Ok((store.clone(), store))
        }
    }
}
