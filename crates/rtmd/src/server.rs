//! Unix-socket listener and per-client channel plumbing
//!
//! One accept loop, then two tasks per connected client: a writer draining
//! the client's buffered outbound queue onto its socket, and a reader
//! watching the socket for disconnect. All tasks observe the shared
//! shutdown signal; `serve` does not return until every one of them has
//! exited and the listening socket is released.

use std::fs;
use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::registry::ClientId;
use crate::sync::SyncServer;

/// Serve client connections until `shutdown` flips.
///
/// Binds the listening socket at the configured path, replacing a stale
/// socket file from a previous run. Failure to bind is fatal; everything
/// after that is scoped to individual clients.
pub async fn serve(server: SyncServer, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let config = server.config().clone();
    config.validate()?;

    match fs::remove_file(&config.socket_path) {
        Ok(()) => debug!(path = %config.socket_path.display(), "removed stale socket file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let listener = UnixListener::bind(&config.socket_path)?;
    info!(path = %config.socket_path.display(), "listening for clients");

    let mut tasks = JoinSet::new();
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("shutdown requested, closing listener");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    spawn_client(&server, &mut tasks, stream, shutdown.clone());
                }
                Err(e) => warn!(error = %e, "accept failed"),
            }
        }
    }

    drop(listener);
    server.begin_shutdown();
    while tasks.join_next().await.is_some() {}

    if let Err(e) = fs::remove_file(&config.socket_path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(error = %e, "could not remove socket file");
        }
    }
    info!("all client handlers exited");
    Ok(())
}

fn spawn_client(
    server: &SyncServer,
    tasks: &mut JoinSet<()>,
    stream: UnixStream,
    shutdown: watch::Receiver<bool>,
) {
    let (id, rx) = match server.register_client() {
        Ok(pair) => pair,
        Err(e) => {
            // Dropping the stream closes the connection.
            warn!(error = %e, "refusing client connection");
            return;
        }
    };
    let (read_half, write_half) = stream.into_split();
    tasks.spawn(write_client(id, write_half, rx, server.clone()));
    tasks.spawn(watch_client(id, read_half, server.clone(), shutdown));
}

/// Drain the client's outbound queue onto its socket.
///
/// Exits when the queue closes (client retired, or server shutdown after
/// the final notice was enqueued) or when the socket fails. A failure here
/// retires only this client.
async fn write_client(
    id: ClientId,
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
    server: SyncServer,
) {
    while let Some(bytes) = rx.recv().await {
        if let Err(e) = writer.write_all(&bytes).await {
            warn!(client = id, error = %e, "send failed, retiring client");
            server.retire_client(id);
            break;
        }
    }
    let _ = writer.shutdown().await;
    debug!(client = id, "writer exited");
}

/// Watch the client's read side for disconnect.
///
/// Clients never legitimately send bytes on this channel; anything
/// received is a protocol violation and closes the channel, without
/// affecting the table or other clients.
async fn watch_client(
    id: ClientId,
    mut reader: OwnedReadHalf,
    server: SyncServer,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut scratch = [0u8; 64];
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            read = reader.read(&mut scratch) => {
                match read {
                    Ok(0) => debug!(client = id, "client closed its channel"),
                    Ok(n) => {
                        warn!(client = id, bytes = n, "unexpected bytes from client, closing channel");
                    }
                    Err(e) => warn!(client = id, error = %e, "client channel error"),
                }
                server.retire_client(id);
                break;
            }
        }
    }
}
