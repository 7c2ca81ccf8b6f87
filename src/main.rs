//! Unisearch HTTP server
//!
//! This is the main entry point for the application.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use unisearch::{
    config,
    network::build_http_client,
    providers::ProviderLoader,
    security::{ContentScanner, PatternScanner},
    web::{create_router, AppState},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first so debug mode can pick the log level
    let settings = config::load()?;

    let default_level = if settings.general.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    info!("Starting unisearch v{}", unisearch::VERSION);
    info!("Loaded configuration for instance: {}", settings.general.instance_name);

    // Initialize HTTP client
    let client = build_http_client(&settings.outgoing)?;
    info!("HTTP client initialized");

    // Load providers
    let registry = ProviderLoader::load(&settings, client);

    let scanner = PatternScanner::from_settings(&settings.security)?.map(|s| {
        info!("Content scanning enabled with {} patterns", s.pattern_count());
        Arc::new(s) as Arc<dyn ContentScanner>
    });

    // Bind address
    let addr = SocketAddr::new(settings.server.bind_address.parse()?, settings.server.port);

    // Create application state and router
    let state = AppState::new(settings, registry, scanner);
    let app = create_router(state);

    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
