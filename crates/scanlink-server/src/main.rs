//! # scanlink-server
//!
//! HTTP server for scanlink.
//!
//! This binary provides:
//! - REST API for scan sessions and discovered peripherals
//! - Server-sent events for discoveries and timeout stops
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package scanlink-server
//!
//! # Without a Bluetooth adapter
//! cargo run --package scanlink-server --no-default-features --features mock-bluetooth
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::net::SocketAddr;

use anyhow::Context;
use scanlink_core::ScanlinkConfig;
use scanlink_server::api::create_router;
use scanlink_server::{logging, radio};
use scanlink_server::state::AppState;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ScanlinkConfig::load_default().context("failed to load configuration")?;

    logging::init(&config.logging)?;

    info!("Starting scanlink-server");

    let driver = radio::connect().await?;
    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .context("invalid server bind address")?;

    let app = create_router(AppState::new(driver, config));

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("scanlink-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
