//! setlog-core - Main entry point
//!
//! Workout session orchestration service: template setup, active session
//! execution, and workout record publication over a local HTTP API.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use setlog_core::api::server::{self, AppContext};
use setlog_core::publisher::OutboxPublisher;
use setlog_core::resolver::TomlTemplateResolver;
use setlog_core::state::SharedState;
use setlog_core::{Config, WorkoutOrchestrator};

/// Command-line arguments for setlog-core
#[derive(Parser, Debug)]
#[command(name = "setlog-core")]
#[command(about = "Workout session orchestration service for setlog")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5761", env = "SETLOG_PORT")]
    port: u16,

    /// Data folder holding the template library and publish outbox
    #[arg(short, long, env = "SETLOG_DATA_FOLDER")]
    data_folder: Option<String>,

    /// Public identity workout records are attributed to
    #[arg(short, long, default_value = "local", env = "SETLOG_IDENTITY")]
    identity: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "setlog_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let data_folder =
        setlog_common::config::resolve_data_folder(args.data_folder.as_deref(), "SETLOG_DATA_FOLDER")
            .context("Failed to resolve data folder")?;
    std::fs::create_dir_all(&data_folder).context("Failed to create data folder")?;

    let config = Config {
        data_folder,
        port: args.port,
    };

    info!("Starting setlog-core on port {}", config.port);
    info!("Data folder: {}", config.data_folder.display());

    let resolver = Arc::new(
        TomlTemplateResolver::load(&config.template_library_path())
            .context("Failed to load template library")?,
    );
    let publisher = Arc::new(OutboxPublisher::new(config.outbox_path()));
    let state = Arc::new(SharedState::new());

    let orchestrator = WorkoutOrchestrator::new(
        state.clone(),
        resolver.clone(),
        publisher,
        args.identity.clone(),
    );

    let ctx = AppContext {
        state,
        orchestrator,
        resolver,
        user_identity: args.identity,
    };

    server::run(config, ctx, shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
