//! webnotify server
//!
//! Accepts notifications over HTTP and streams them to WebSocket clients,
//! replaying recent history to every new client.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use webnotify_hub::Hub;
use webnotify_server::config::{Cli, ServerConfig};
use webnotify_server::http;

/// How long in-flight requests get to finish after an interrupt
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    info!("Starting webnotify server v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = ServerConfig::load(&cli).context("Failed to load configuration")?;
    match &config.config_path {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No configuration file, using defaults and flags"),
    }

    let doc_root = config
        .doc_root
        .clone()
        .context("Document root is mandatory")?;

    let hub = Hub::new(config.hub.clone()).context("Failed to create hub")?;
    let app = http::router(Arc::clone(&hub), &doc_root, config.max_body_bytes);

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    info!(
        "Listening on port {} (document root: {})",
        config.port,
        doc_root.display()
    );

    let shutdown = CancellationToken::new();
    let mut server = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
        }
    });

    // Wait for SIGINT
    tokio::select! {
        result = &mut server => {
            hub.close().await;
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e).context("HTTP server error"),
                Err(e) => Err(e).context("HTTP server task failed"),
            };
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for interrupt signal")?;
            info!("Interrupt signal received, initiating web server shutdown...");
        }
    }

    // Stop accepting, then close the hub so every open stream ends and the server can drain.
    shutdown.cancel();
    let drain = async {
        hub.close().await;
        server.await
    };

    match tokio::time::timeout(SHUTDOWN_GRACE, drain).await {
        Ok(Ok(Ok(()))) => info!("Web server graceful shutdown"),
        Ok(Ok(Err(e))) => error!("HTTP server error during shutdown: {}", e),
        Ok(Err(e)) => error!("HTTP server task failed: {}", e),
        Err(_) => warn!(
            "Graceful shutdown did not finish within {}s",
            SHUTDOWN_GRACE.as_secs()
        ),
    }

    info!("Shutdown successful");
    Ok(())
}
