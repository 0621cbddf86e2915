//! rtm-client - Routing Table Manager client replica daemon
//!
//! Connects to the rtmd socket, installs the initial snapshot, applies
//! deltas as they arrive and prints the resulting table. On a lost
//! connection the replica is flushed and resynced from a fresh snapshot.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rtm_client::{Applied, ClientSession, Replica, Result, SessionEnd};

/// Routing Table Manager client replica
#[derive(Parser, Debug)]
#[command(name = "rtm-client")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path of the server's Unix socket
    #[arg(short = 's', long, default_value_os_t = default_socket_path())]
    socket: PathBuf,

    /// Seconds to wait between reconnect attempts
    #[arg(long, default_value = "2")]
    retry_secs: u64,

    /// Exit instead of reconnecting when the connection is lost
    #[arg(long)]
    once: bool,
}

fn default_socket_path() -> PathBuf {
    std::env::temp_dir().join("rtmd.sock")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging();

    info!(socket = %args.socket.display(), "--- Starting rtm-client ---");
    let mut replica = Replica::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, exiting");
                break;
            }
            outcome = run_session(&args, &mut replica) => match outcome {
                Ok(SessionEnd::Shutdown) => {
                    info!("server shut down, exiting");
                    break;
                }
                Ok(SessionEnd::Disconnected) => {
                    warn!("connection lost, will resync from a fresh snapshot");
                }
                Err(e) => warn!(error = %e, "session failed"),
            }
        }

        if args.once {
            break;
        }
        sleep(Duration::from_secs(args.retry_secs)).await;
    }

    Ok(())
}

/// Run one session: connect, sync, apply messages until the channel ends.
async fn run_session(args: &Args, replica: &mut Replica) -> Result<SessionEnd> {
    replica.reset();
    let mut session = ClientSession::connect(&args.socket).await?;

    loop {
        match session.recv().await? {
            None => return Ok(SessionEnd::Disconnected),
            Some(message) => match replica.apply(message)? {
                Applied::Snapshot { entries } => {
                    info!(entries, "snapshot applied");
                    print!("{}", replica.table().render());
                }
                Applied::Delta { op } => {
                    info!(%op, "delta applied");
                    print!("{}", replica.table().render());
                }
                Applied::Shutdown => return Ok(SessionEnd::Shutdown),
            },
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}
