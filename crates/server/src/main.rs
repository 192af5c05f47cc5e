use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parcelwatch_core::{
    load_config, validate_config, HttpPageScraper, HttpSessionFactory, ProcessingQueue,
    RetryPolicy, RetryingScrapeClient, SessionPool, SqliteTrackStore,
};
use parcelwatch_server::api::{create_router, WsBroadcaster};
use parcelwatch_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("PARCELWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("parcelwatch {} starting", VERSION);
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("Configuration loaded (hash {})", &config_hash[..16]);
    info!("Database path: {:?}", config.database.path);

    let track_store = Arc::new(
        SqliteTrackStore::new(&config.database.path).context("Failed to create track store")?,
    );
    info!("Track store initialized");

    // Sessions are expensive; create them all up front and fail fast.
    let factory = HttpSessionFactory::new(&config.session_pool);
    let pool = Arc::new(
        SessionPool::new(&factory, config.session_pool.size)
            .await
            .context("Failed to create session pool")?,
    );

    let client = RetryingScrapeClient::new(
        HttpPageScraper::new(&config.carrier),
        RetryPolicy::from_config(&config.carrier),
    );
    info!(
        "Carrier client targeting {} ({} attempts)",
        config.carrier.base_url, config.carrier.max_attempts
    );

    let ws_broadcaster = WsBroadcaster::default();

    let queue = Arc::new(ProcessingQueue::new(
        config.queue.clone(),
        Arc::clone(&pool),
        Arc::new(client),
        track_store.clone(),
        Arc::new(ws_broadcaster.clone()),
        Arc::new(ws_broadcaster.clone()),
    ));
    queue.start().await;

    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&queue),
        Arc::clone(&pool),
        track_store,
        ws_broadcaster,
    ));

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    queue.stop().await;
    pool.shutdown().await;
    info!("Shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
