//! rtmd - Routing Table Manager server daemon
//!
//! Owns the authoritative L3 routing table, applies operator CUD commands
//! from the console, and keeps every connected client replica synchronized
//! over a Unix domain socket.

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rtmd::{console, serve, ConfigFile, ServerConfig, SyncServer};

/// Routing Table Manager synchronization server
#[derive(Parser, Debug)]
#[command(name = "rtmd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path of the listening Unix socket
    #[arg(short = 's', long)]
    socket: Option<PathBuf>,

    /// Optional TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Maximum number of concurrently connected clients
    #[arg(long)]
    max_clients: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging();

    let file = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let config = ServerConfig::resolve(file, args.socket, args.max_clients);
    config.validate()?;

    info!("--- Starting rtmd ---");
    info!(
        socket = %config.socket_path.display(),
        max_clients = config.max_clients,
        "resolved configuration"
    );

    let server = SyncServer::new(config);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Ctrl-C flips the shared shutdown signal; every task observes it.
    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received SIGINT, shutting down");
            let _ = ctrl_c_tx.send(true);
        }
    });

    let console_task = tokio::spawn(console::run(server.clone(), shutdown_rx.clone()));

    let result = serve(server, shutdown_rx).await;
    if let Err(e) = &result {
        error!(error = %e, "server exited with error");
    }

    // serve() only returns once shutdown is underway; stop the console too.
    let _ = shutdown_tx.send(true);
    let _ = console_task.await;

    info!("rtmd exiting");
    result.map_err(Into::into)
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}
