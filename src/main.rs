use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pukul_tikus::config::ServerConfig;
use pukul_tikus::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging (RUST_LOG overrides)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Pukul Tikus backend v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServerConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        "Configuration loaded: {}:{}, max_connections={}",
        config.bind_address, config.port, config.db_max_connections
    );

    let state = AppState::connect(&config)
        .await
        .context("failed to open database")?;
    let pool = state.pool.clone();

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server ready on http://{}", addr);

    // Shutdown signal handler
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            return;
        }
        info!("Shutdown signal received");
    };

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    // Cleanup
    pool.close().await;
    info!("Server stopped");

    Ok(())
}
