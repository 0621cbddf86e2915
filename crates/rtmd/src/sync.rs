//! Authoritative table state and CUD fan-out
//!
//! The routing table and the client registry live behind one mutex, so a
//! table mutation plus its delta fan-out is a single atomic unit relative
//! to registering a new client and capturing its snapshot. A CUD committed
//! before a snapshot is captured is folded into that snapshot; one
//! committed after reaches the client as a delta; no operation can be both
//! missing from the snapshot and never delivered.
//!
//! Nothing blocks while the lock is held: fan-out only enqueues onto each
//! client's buffered channel, and the per-client writer tasks do the
//! socket I/O outside the lock.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

use rtm_proto::{CudOp, WireMessage};
use rtm_types::{RouteEntry, RoutingTable, TableError};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::registry::{ClientId, ClientRegistry};

struct SharedState {
    table: RoutingTable,
    clients: ClientRegistry,
}

/// Shared handle to the sync server state. Cheap to clone; all clones see
/// the same table and client set.
#[derive(Clone)]
pub struct SyncServer {
    inner: Arc<ServerInner>,
}

struct ServerInner {
    config: ServerConfig,
    state: Mutex<SharedState>,
}

impl SyncServer {
    /// Create a server with an empty table and no clients.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                config,
                state: Mutex::new(SharedState {
                    table: RoutingTable::new(),
                    clients: ClientRegistry::new(),
                }),
            }),
        }
    }

    /// The configuration this server runs with.
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Insert or overwrite an entry and fan the create delta out to every
    /// synced client. Returns the number of clients the delta reached.
    pub fn create(&self, entry: RouteEntry) -> usize {
        let mut state = self.inner.state.lock();
        state.table.create_entry(entry.clone());
        let bytes = WireMessage::delta_bytes(CudOp::Create, &entry);
        let delivered = state.clients.broadcast(&bytes);
        info!(route = %entry, clients = delivered, "route created");
        delivered
    }

    /// Replace an existing entry in place and fan the update delta out.
    ///
    /// Fails with `NotFound` if no entry exists for the destination; the
    /// table is untouched and nothing is sent.
    pub fn update(&self, entry: RouteEntry) -> Result<usize, TableError> {
        let mut state = self.inner.state.lock();
        state.table.update_entry(entry.clone())?;
        let bytes = WireMessage::delta_bytes(CudOp::Update, &entry);
        let delivered = state.clients.broadcast(&bytes);
        info!(route = %entry, clients = delivered, "route updated");
        Ok(delivered)
    }

    /// Remove the entry keyed by `destination` and fan the delete delta
    /// out. Deleting an absent destination is a no-op on the table but
    /// still broadcast, mirroring the idempotent delete on the replicas.
    pub fn delete(&self, destination: u32, mask: u8) -> usize {
        let mut state = self.inner.state.lock();
        let entry = state
            .table
            .delete_entry(destination)
            .unwrap_or_else(|| RouteEntry::new(destination, mask, 0, ""));
        let bytes = WireMessage::delta_bytes(CudOp::Delete, &entry);
        let delivered = state.clients.broadcast(&bytes);
        info!(route = %entry, clients = delivered, "route deleted");
        delivered
    }

    /// Register a newly accepted client: allocate its session id, capture a
    /// snapshot of the current table, enqueue it, and mark the client
    /// synced — all in one critical section.
    ///
    /// Returns the client id and the receiving end of its outbound channel,
    /// or `ClientLimit` when the client set is full.
    pub fn register_client(
        &self,
    ) -> Result<(ClientId, mpsc::UnboundedReceiver<Vec<u8>>), ServerError> {
        let mut state = self.inner.state.lock();
        if state.clients.len() >= self.inner.config.max_clients {
            return Err(ServerError::ClientLimit {
                limit: self.inner.config.max_clients,
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let id = state.clients.register(tx);
        let snapshot = WireMessage::snapshot_bytes(&state.table);
        state.clients.begin_sync(id);
        state.clients.send_to(id, snapshot);
        state.clients.mark_synced(id);
        info!(
            client = id,
            entries = state.table.size(),
            "client connected, snapshot enqueued"
        );
        Ok((id, rx))
    }

    /// Retire one client channel. Safe to call more than once.
    pub fn retire_client(&self, id: ClientId) {
        let mut state = self.inner.state.lock();
        if state.clients.retire(id) {
            debug!(client = id, remaining = state.clients.len(), "client disconnected");
        }
    }

    /// Notify remaining clients that the server is going away, retire them
    /// all and clear the table.
    pub fn begin_shutdown(&self) {
        let mut state = self.inner.state.lock();
        let notified = state.clients.close_all(&WireMessage::shutdown_bytes());
        state.table.clear();
        info!(clients = notified, "shutdown notice sent, table cleared");
    }

    /// Number of currently connected clients.
    pub fn client_count(&self) -> usize {
        self.inner.state.lock().clients.len()
    }

    /// Copy of the current table.
    pub fn snapshot(&self) -> RoutingTable {
        self.inner.state.lock().table.clone()
    }

    /// Rendered view of the current table.
    pub fn render_table(&self) -> String {
        self.inner.state.lock().table.render()
    }
}
