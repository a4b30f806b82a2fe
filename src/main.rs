//! Main entry point for the Generation Fallback Gateway

use gen_fallback_gateway::{
    api,
    backend::gemini::GeminiInvoker,
    config::Settings,
    gateway::{catalog::BackendCatalog, resolver::FallbackResolver},
    AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::load()?;
    settings.validate()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if settings.logging.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().pretty()).init();
    }

    info!("Starting Generation Fallback Gateway");
    info!(
        "Loaded configuration: server={}:{}",
        settings.server.host, settings.server.port
    );

    // Build the ranked catalog
    let catalog = Arc::new(BackendCatalog::from_config(&settings.backends)?);

    let timeout = match settings.resolver.timeout_ms {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    };
    let resolver = Arc::new(FallbackResolver::with_timeout(catalog, timeout));

    // Provider client with explicit credentials
    let invoker = GeminiInvoker::new(&settings.gemini)?;
    if !invoker.has_api_key() {
        warn!("No Gemini API key configured; every backend invocation will fail");
    }

    let shutdown = CancellationToken::new();
    let settings = Arc::new(settings);

    let app_state = Arc::new(AppState {
        settings: settings.clone(),
        resolver,
        invoker: Arc::new(invoker),
        shutdown: shutdown.clone(),
    });

    // Build the router
    let app = api::routes::create_router(app_state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, cancelling in-flight requests");
    shutdown.cancel();
}
