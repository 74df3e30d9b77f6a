//! Poll Server - Entry Point
//!
//! Starts the TCP listener and PollServer actor, accepting connections
//! until Ctrl-C.

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use poll_server::server::CHANNEL_BUFFER_SIZE;
use poll_server::{serve, Config, Dispatcher, PollServer, ServerHandle, SnapshotStorage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    // Initialize logging with environment filter
    // RUST_LOG wins over --log-level, e.g. RUST_LOG=poll_server=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .init();

    // Start TCP listener
    let listener = TcpListener::bind(&config.bind).await?;
    info!("Poll server listening on {}", config.bind);

    // Create PollServer actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    tokio::spawn(PollServer::new(cmd_rx).run());
    info!("PollServer actor started");

    let storage = SnapshotStorage::new(&config.data_dir);
    info!("Snapshots are stored in {}", storage.data_dir().display());
    let dispatcher = Dispatcher::new(ServerHandle::new(cmd_tx), storage);

    serve(listener, dispatcher, config.max_line_length, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl-C handler: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await;

    info!("Poll server stopped");
    Ok(())
}
