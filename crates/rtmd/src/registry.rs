//! Registry of connected client channels
//!
//! Each connected client is a buffered outbound byte-message channel plus a
//! sync-protocol state. The registry itself is not synchronized; the server
//! guards it together with the routing table under one lock so that table
//! mutation and fan-out form a single atomic unit.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Opaque per-session client identifier.
pub type ClientId = u64;

/// Sync-protocol state of one client channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Accepted, not yet registered for deltas.
    Connecting,
    /// Snapshot in flight.
    Syncing,
    /// Receiving deltas.
    Synced,
    /// Being retired; no further messages are routed to it.
    Closing,
    /// Gone. Unknown ids report this state.
    Closed,
}

struct ClientHandle {
    state: ClientState,
    sender: mpsc::UnboundedSender<Vec<u8>>,
}

/// The set of active client channels.
#[derive(Default)]
pub struct ClientRegistry {
    next_id: ClientId,
    clients: HashMap<ClientId, ClientHandle>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are connected.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Current state of a client channel; retired or never-known ids are
    /// `Closed`.
    pub fn state(&self, id: ClientId) -> ClientState {
        self.clients
            .get(&id)
            .map(|handle| handle.state)
            .unwrap_or(ClientState::Closed)
    }

    /// Register a new client channel in `Connecting` state and allocate its
    /// session id.
    pub fn register(&mut self, sender: mpsc::UnboundedSender<Vec<u8>>) -> ClientId {
        let id = self.next_id;
        self.next_id += 1;
        self.clients.insert(
            id,
            ClientHandle {
                state: ClientState::Connecting,
                sender,
            },
        );
        id
    }

    /// Mark the client's snapshot as in flight.
    pub fn begin_sync(&mut self, id: ClientId) {
        if let Some(handle) = self.clients.get_mut(&id) {
            handle.state = ClientState::Syncing;
        }
    }

    /// Mark the client as fully synced; it now receives deltas.
    pub fn mark_synced(&mut self, id: ClientId) {
        if let Some(handle) = self.clients.get_mut(&id) {
            handle.state = ClientState::Synced;
        }
    }

    /// Enqueue bytes for one client. Returns false if the client is gone or
    /// its channel is closed.
    pub fn send_to(&mut self, id: ClientId, bytes: Vec<u8>) -> bool {
        match self.clients.get(&id) {
            Some(handle) => handle.sender.send(bytes).is_ok(),
            None => false,
        }
    }

    /// Enqueue bytes to every `Synced` client. Clients whose channel is
    /// already closed are retired on the spot; a dead channel never blocks
    /// or fails delivery to the others. Returns the number of clients the
    /// message was enqueued for.
    pub fn broadcast(&mut self, bytes: &[u8]) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();
        for (&id, handle) in &self.clients {
            if handle.state != ClientState::Synced {
                continue;
            }
            if handle.sender.send(bytes.to_vec()).is_ok() {
                delivered += 1;
            } else {
                dead.push(id);
            }
        }
        for id in dead {
            warn!(client = id, "outbound channel closed, retiring client");
            self.retire(id);
        }
        delivered
    }

    /// Remove a client channel, dropping its sender so its writer task
    /// drains and exits. Idempotent. Returns true if the client was present.
    pub fn retire(&mut self, id: ClientId) -> bool {
        if let Some(handle) = self.clients.get_mut(&id) {
            handle.state = ClientState::Closing;
        }
        let removed = self.clients.remove(&id).is_some();
        if removed {
            debug!(client = id, "client retired");
        }
        removed
    }

    /// Send `notice` to every remaining client best-effort, then retire all
    /// of them. Returns the number of clients notified.
    pub fn close_all(&mut self, notice: &[u8]) -> usize {
        let mut notified = 0;
        for handle in self.clients.values_mut() {
            handle.state = ClientState::Closing;
            if handle.sender.send(notice.to_vec()).is_ok() {
                notified += 1;
            }
        }
        self.clients.clear();
        notified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (
        mpsc::UnboundedSender<Vec<u8>>,
        mpsc::UnboundedReceiver<Vec<u8>>,
    ) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_register_allocates_unique_ids() {
        let mut registry = ClientRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();

        let a = registry.register(tx1);
        let b = registry.register(tx2);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.state(a), ClientState::Connecting);
    }

    #[test]
    fn test_state_transitions() {
        let mut registry = ClientRegistry::new();
        let (tx, _rx) = channel();
        let id = registry.register(tx);

        registry.begin_sync(id);
        assert_eq!(registry.state(id), ClientState::Syncing);
        registry.mark_synced(id);
        assert_eq!(registry.state(id), ClientState::Synced);
        registry.retire(id);
        assert_eq!(registry.state(id), ClientState::Closed);
    }

    #[test]
    fn test_broadcast_reaches_only_synced_clients() {
        let mut registry = ClientRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();

        let synced = registry.register(tx1);
        registry.begin_sync(synced);
        registry.mark_synced(synced);
        let connecting = registry.register(tx2);

        let delivered = registry.broadcast(b"delta");
        assert_eq!(delivered, 1);
        assert_eq!(rx1.try_recv().unwrap(), b"delta".to_vec());
        assert!(rx2.try_recv().is_err());
        assert_eq!(registry.state(connecting), ClientState::Connecting);
    }

    #[test]
    fn test_broadcast_retires_dead_channels() {
        let mut registry = ClientRegistry::new();
        let (tx1, rx1) = channel();
        let (tx2, mut rx2) = channel();

        let dead = registry.register(tx1);
        registry.mark_synced(dead);
        let live = registry.register(tx2);
        registry.mark_synced(live);

        drop(rx1);
        let delivered = registry.broadcast(b"delta");

        assert_eq!(delivered, 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.state(dead), ClientState::Closed);
        assert_eq!(rx2.try_recv().unwrap(), b"delta".to_vec());
    }

    #[test]
    fn test_retire_is_idempotent() {
        let mut registry = ClientRegistry::new();
        let (tx, _rx) = channel();
        let id = registry.register(tx);

        assert!(registry.retire(id));
        assert!(!registry.retire(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_close_all_notifies_and_clears() {
        let mut registry = ClientRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        let a = registry.register(tx1);
        registry.mark_synced(a);
        let b = registry.register(tx2);
        registry.mark_synced(b);

        let notified = registry.close_all(b"bye");
        assert_eq!(notified, 2);
        assert!(registry.is_empty());
        assert_eq!(rx1.try_recv().unwrap(), b"bye".to_vec());
        assert_eq!(rx2.try_recv().unwrap(), b"bye".to_vec());
    }
}
