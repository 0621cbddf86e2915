//! Connection to the RTM server

use std::path::Path;

use tokio::net::UnixStream;
use tracing::debug;

use rtm_proto::{read_message, WireMessage};

use crate::error::Result;
use crate::replica::{Applied, Replica};

/// How a pumped session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server announced shutdown.
    Shutdown,
    /// The channel closed without a shutdown notice; the replica is stale
    /// and must resync from a fresh snapshot on reconnect.
    Disconnected,
}

/// One connected session to the server.
pub struct ClientSession {
    stream: UnixStream,
}

impl ClientSession {
    /// Connect to the server's listening socket.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let stream = UnixStream::connect(path.as_ref()).await?;
        debug!(path = %path.as_ref().display(), "connected to server");
        Ok(Self { stream })
    }

    /// Receive the next message; `None` on a clean end-of-stream.
    pub async fn recv(&mut self) -> Result<Option<WireMessage>> {
        Ok(read_message(&mut self.stream).await?)
    }

    /// Drive this session to completion, applying every message to the
    /// replica.
    pub async fn pump(&mut self, replica: &mut Replica) -> Result<SessionEnd> {
        loop {
            match self.recv().await? {
                None => return Ok(SessionEnd::Disconnected),
                Some(message) => {
                    if replica.apply(message)? == Applied::Shutdown {
                        return Ok(SessionEnd::Shutdown);
                    }
                }
            }
        }
    }
}
