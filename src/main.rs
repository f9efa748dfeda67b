// offline-vault - Offline-first caching proxy with bucketed storage
// Author: kelexine (https://github.com/kelexine)

use anyhow::Result;
use clap::Parser;
use offline_vault::cli::Args;
use offline_vault::config::AppConfig;
use offline_vault::control::ControlHandle;
use offline_vault::engine::CacheEngine;
use offline_vault::fetch::HttpFetcher;
use offline_vault::server::create_router;
use offline_vault::storage::InMemoryStorage;
use offline_vault::utils::logging;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

/// Queue depth of the control channel.
const CONTROL_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let config = AppConfig::load(args.config.as_deref())?;
    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting offline-vault v{}", env!("CARGO_PKG_VERSION"));
    info!("Caching origin {}", config.upstream.origin);

    // Phase 3: Build the engine
    let fetcher = Arc::new(HttpFetcher::new(&config.upstream)?);
    let storage = Arc::new(InMemoryStorage::new());
    let engine = CacheEngine::new(&config, storage, fetcher)?;

    // Phase 4: Install and activate
    if args.skip_precache {
        info!("Skipping precache");
    } else {
        let report = engine.lifecycle().install().await;
        if !report.failed.is_empty() {
            warn!("{} precache url(s) could not be cached", report.failed.len());
        }
    }
    engine.lifecycle().activate().await?;
    let eviction = engine
        .lifecycle()
        .spawn_eviction(Duration::from_secs(config.eviction.interval_seconds.max(1)));

    // Phase 5: Control channel
    let (control, control_task) = ControlHandle::spawn(engine.control_handler().clone(), CONTROL_CAPACITY);

    // Phase 6: Build and start HTTP server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = create_router(config, engine, control)?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 7: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eviction.abort();
    control_task.abort();
    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
