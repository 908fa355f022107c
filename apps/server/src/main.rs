//! Jamroom Server - standalone headless server for collaborative music
//! queues.
//!
//! Hosts create rooms, participants join over WebSocket, suggest and vote
//! on songs, and receive authoritative room snapshots after every state
//! change. This binary wires the core library to its deployment
//! dependencies (Redis health backend, credentials, port) and runs until
//! signaled.

mod config;
mod kv;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use jamroom_core::{start_server, AppState, AuthService, NoopPinger, Pinger, RoomRegistry};
use tokio::signal;

use crate::config::ServerConfig;
use crate::kv::RedisPinger;

/// Jamroom Server - collaborative music-queue rooms over WebSocket.
#[derive(Parser, Debug)]
#[command(name = "jamroom-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "JAMROOM_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "PORT")]
    port: Option<u16>,

    /// Redis address for the health check (overrides config file).
    #[arg(long, env = "REDIS_ADDR")]
    kv_addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Jamroom Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(addr) = args.kv_addr {
        config.kv_addr = Some(addr);
    }

    log::info!("Configuration: port={}", config.port);
    if config.using_default_credentials() {
        log::warn!(
            "Using default login credentials; set JAMROOM_AUTH_USERNAME and \
             JAMROOM_AUTH_PASSWORD for anything beyond local development"
        );
    }

    // Wire the health-check backend
    let kv: Arc<dyn Pinger> = match config.kv_addr.as_deref() {
        Some(addr) => {
            let pinger = RedisPinger::connect(addr)
                .await
                .with_context(|| format!("Failed to connect to Redis at {}", addr))?;
            log::info!("Connected to Redis at {}", addr);
            Arc::new(pinger)
        }
        None => {
            log::warn!("No Redis address configured; health check skips the key-value backend");
            Arc::new(NoopPinger)
        }
    };

    let state = AppState::new(
        Arc::new(RoomRegistry::new()),
        Arc::new(AuthService::new(config.credentials())),
        kv,
    );

    let port = config.port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(state, port).await {
            log::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, stopping server");
    server_handle.abort();
    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
