mod backend;
mod config;
mod db;
mod errors;
mod models;
mod presentation;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backend::memory::MemoryBackend;
use crate::backend::postgres::PgBackend;
use crate::backend::rest::RestBackend;
use crate::backend::EventBackend;
use crate::config::{BackendConfig, Config};
use crate::db::create_pool;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::seed::{
    default_catalog, load_catalog, validate_catalog, SeedCatalog, SEED_CATALOG_VERSION,
};
use crate::store::EventStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting eventgate v{}", env!("CARGO_PKG_VERSION"));

    let backend = build_backend(&config).await?;
    info!("Events backend initialized ({})", backend.name());

    let seed_catalog = match &config.seed_file {
        Some(path) => {
            let events = load_catalog(path)
                .with_context(|| format!("Failed to load seed catalog from {}", path.display()))?;
            info!("Seed catalog loaded from {} ({} events)", path.display(), events.len());
            SeedCatalog::File(events)
        }
        None => {
            let events = default_catalog();
            validate_catalog(&events, Utc::now()).context("Built-in seed catalog is invalid")?;
            info!(
                "Using built-in seed catalog v{SEED_CATALOG_VERSION} ({} events)",
                events.len()
            );
            SeedCatalog::Builtin
        }
    };

    if config.admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN is not set; /seed and POST /events are open to any caller");
    }

    // Build app state
    let state = AppState {
        store: EventStore::new(backend),
        seed_catalog: Arc::new(seed_catalog),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs the events backend selected by `EVENT_BACKEND`.
async fn build_backend(config: &Config) -> Result<Arc<dyn EventBackend>> {
    let timeout = Duration::from_secs(config.backend_timeout_secs);
    let backend: Arc<dyn EventBackend> = match &config.backend {
        BackendConfig::Rest { url, api_key } => {
            Arc::new(RestBackend::new(url, api_key.clone(), timeout)?)
        }
        BackendConfig::Postgres { database_url } => {
            Arc::new(PgBackend::new(create_pool(database_url, timeout).await?))
        }
        BackendConfig::Memory => {
            tracing::warn!("Using the in-memory events backend; data is lost on restart");
            Arc::new(MemoryBackend::new())
        }
    };
    Ok(backend)
}
