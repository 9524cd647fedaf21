use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

use turnstile::admission::AdmissionEngine;
use turnstile::config::TurnstileConfig;
use turnstile::grpc::GrpcServer;

/// In-process admission control service.
#[derive(Debug, Parser)]
#[command(name = "turnstile", version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("Starting Turnstile Admission Control Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration (use defaults when no file is given)
    let config = match &args.config {
        Some(path) => TurnstileConfig::from_file(path)?,
        None => TurnstileConfig::default(),
    };
    info!(grpc_addr = %config.server.grpc_addr, "Configuration loaded");

    // Initialize the admission engine; invalid parameters fail here,
    // before the server accepts a single request.
    let engine = Arc::new(AdmissionEngine::new(&config.admission)?);
    info!("Admission engine initialized");

    // Start one expiry sweeper per algorithm store.
    let (shutdown_tx, _) = broadcast::channel(1);
    let sweepers = engine.spawn_sweepers(&shutdown_tx);
    info!(tasks = sweepers.len(), "Expiry sweepers started");

    // Create and start the gRPC server
    let grpc_server = GrpcServer::new(config.server.grpc_addr, Arc::clone(&engine));

    info!("Starting gRPC server on {}", config.server.grpc_addr);

    // Run the server with graceful shutdown on Ctrl+C
    grpc_server.serve_with_shutdown(shutdown_signal()).await?;

    // Stop the sweepers once the server has drained.
    let _ = shutdown_tx.send(());
    futures::future::join_all(sweepers).await;

    info!("Turnstile Admission Control Service stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
