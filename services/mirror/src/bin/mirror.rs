//! services/mirror/src/bin/mirror.rs

use mirror_lib::{
    adapters::{FileStore, HttpTransport, JsonTrickStore, MemoryStore, RouterTransport},
    config::Config,
    error::ApiError,
    session::SessionContext,
    web::{mirror_router, state::AppState, trick_router, Interceptor, Transport},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tricklist_core::ports::{KeyValueStore, SystemClock};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting mirror...");

    // --- 2. Open the Storage Scopes ---
    let durable: Arc<dyn KeyValueStore> = match &config.state_dir {
        Some(dir) => Arc::new(FileStore::open(dir.join("durable.json"))),
        None => {
            warn!("STATE_DIR not set; durable state will not survive a restart.");
            Arc::new(MemoryStore::new())
        }
    };
    let browsing: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let session = SessionContext::init(durable, browsing, Arc::new(SystemClock), &config)?;

    // --- 3. Choose the Upstream ---
    let upstream: Arc<dyn Transport> = match &config.upstream_url {
        Some(url) => {
            info!(%url, "Forwarding passthrough requests to a remote backend.");
            Arc::new(HttpTransport::new(url.clone()))
        }
        None => {
            info!(file = %config.tricks_file.display(), "Serving tricks from the local store.");
            let repo = Arc::new(JsonTrickStore::new(config.tricks_file.clone()));
            Arc::new(RouterTransport::new(trick_router(repo, config.static_dir.as_deref())))
        }
    };

    // --- 4. Build the Shared AppState ---
    let interceptor = Interceptor::new(upstream, session.clone(), config.stream_delay);
    let app_state = Arc::new(AppState {
        transport: Arc::new(interceptor),
    });
    let app = mirror_router(app_state);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The browsing session ends with the process.
    session.end_browsing_session()?;
    info!("Mirror stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal.");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}
