//! Client-local table replica
//!
//! Pure state machine, independent of any transport: enforces the
//! snapshot-first protocol order and applies deltas to the local table.

use tracing::debug;

use rtm_proto::{CudOp, WireMessage};
use rtm_types::RoutingTable;

use crate::error::{ClientError, Result};

/// What applying one message did to the replica.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// Snapshot installed, replacing all local state.
    Snapshot {
        /// Entries the snapshot carried.
        entries: usize,
    },
    /// A single-entry delta was applied.
    Delta {
        /// The operation the server committed.
        op: CudOp,
    },
    /// The server announced shutdown; local state was flushed.
    Shutdown,
}

/// A client-side copy of the server's routing table.
#[derive(Debug, Default)]
pub struct Replica {
    table: RoutingTable,
    synced: bool,
}

impl Replica {
    /// Create an empty, unsynced replica.
    pub fn new() -> Self {
        Self::default()
    }

    /// The replicated table.
    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Returns true once a snapshot has been applied this session.
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Drop all state ahead of a reconnect; the next message must again be
    /// a snapshot.
    pub fn reset(&mut self) {
        self.table.clear();
        self.synced = false;
    }

    /// Apply one message from the server.
    ///
    /// The first message of a session must be a snapshot; a delta before
    /// it, or a second snapshot after it, is a protocol violation.
    pub fn apply(&mut self, message: WireMessage) -> Result<Applied> {
        if !self.synced {
            return match message {
                WireMessage::Snapshot(table) => {
                    let entries = table.size();
                    self.table = table;
                    self.synced = true;
                    Ok(Applied::Snapshot { entries })
                }
                WireMessage::Shutdown => {
                    self.reset();
                    Ok(Applied::Shutdown)
                }
                other => Err(ClientError::protocol(format!(
                    "{} delta before initial snapshot",
                    other.kind()
                ))),
            };
        }

        match message {
            WireMessage::Snapshot(_) => {
                Err(ClientError::protocol("second snapshot on a synced session"))
            }
            WireMessage::Create(entry) => {
                self.table.create_entry(entry);
                Ok(Applied::Delta { op: CudOp::Create })
            }
            WireMessage::Update(entry) => {
                // An update to a key this replica never saw still has to
                // converge; fall back to insert.
                if self.table.update_entry(entry.clone()).is_err() {
                    debug!(route = %entry, "update for unknown destination, inserting");
                    self.table.create_entry(entry);
                }
                Ok(Applied::Delta { op: CudOp::Update })
            }
            WireMessage::Delete(entry) => {
                self.table.delete_entry(entry.destination);
                Ok(Applied::Delta { op: CudOp::Delete })
            }
            WireMessage::Shutdown => {
                self.reset();
                Ok(Applied::Shutdown)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rtm_types::{parse_address, RouteEntry};

    fn entry(dest: &str, mask: u8, gw: &str, oif: &str) -> RouteEntry {
        RouteEntry::new(
            parse_address(dest).unwrap(),
            mask,
            parse_address(gw).unwrap(),
            oif,
        )
    }

    fn snapshot(entries: Vec<RouteEntry>) -> WireMessage {
        WireMessage::Snapshot(entries.into_iter().collect())
    }

    #[test]
    fn test_snapshot_must_come_first() {
        let mut replica = Replica::new();
        let err = replica
            .apply(WireMessage::Create(entry("10.0.0.1", 32, "10.0.0.254", "eth0")))
            .unwrap_err();
        assert!(matches!(err, ClientError::ProtocolViolation { .. }));
        assert!(!replica.is_synced());
    }

    #[test]
    fn test_snapshot_replaces_state_wholesale() {
        let mut replica = Replica::new();
        let applied = replica
            .apply(snapshot(vec![
                entry("122.1.1.1", 32, "10.1.1.1", "eth0"),
                entry("130.1.1.0", 24, "10.1.1.1", "eth1"),
            ]))
            .unwrap();
        assert_eq!(applied, Applied::Snapshot { entries: 2 });
        assert!(replica.is_synced());
        assert_eq!(replica.table().size(), 2);
    }

    #[test]
    fn test_deltas_apply_in_order() {
        let mut replica = Replica::new();
        replica.apply(snapshot(vec![])).unwrap();

        let e = entry("10.0.0.1", 32, "10.0.0.254", "eth0");
        replica.apply(WireMessage::Create(e.clone())).unwrap();
        assert_eq!(replica.table().get(e.destination).unwrap(), &e);

        let updated = entry("10.0.0.1", 32, "10.0.0.253", "eth1");
        replica.apply(WireMessage::Update(updated.clone())).unwrap();
        assert_eq!(replica.table().get(e.destination).unwrap(), &updated);

        replica.apply(WireMessage::Delete(updated)).unwrap();
        assert!(replica.table().is_empty());
    }

    #[test]
    fn test_update_for_unknown_destination_inserts() {
        let mut replica = Replica::new();
        replica.apply(snapshot(vec![])).unwrap();

        let e = entry("10.0.0.1", 32, "10.0.0.254", "eth0");
        let applied = replica.apply(WireMessage::Update(e.clone())).unwrap();
        assert_eq!(applied, Applied::Delta { op: CudOp::Update });
        assert_eq!(replica.table().get(e.destination).unwrap(), &e);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut replica = Replica::new();
        replica.apply(snapshot(vec![])).unwrap();
        replica
            .apply(WireMessage::Delete(entry("10.0.0.1", 32, "10.0.0.254", "eth0")))
            .unwrap();
        assert!(replica.table().is_empty());
    }

    #[test]
    fn test_second_snapshot_is_a_violation() {
        let mut replica = Replica::new();
        replica.apply(snapshot(vec![])).unwrap();
        let err = replica.apply(snapshot(vec![])).unwrap_err();
        assert!(matches!(err, ClientError::ProtocolViolation { .. }));
    }

    #[test]
    fn test_shutdown_flushes_state() {
        let mut replica = Replica::new();
        replica
            .apply(snapshot(vec![entry("10.0.0.1", 32, "10.0.0.254", "eth0")]))
            .unwrap();

        let applied = replica.apply(WireMessage::Shutdown).unwrap();
        assert_eq!(applied, Applied::Shutdown);
        assert!(replica.table().is_empty());
        assert!(!replica.is_synced());
    }

    #[test]
    fn test_reset_allows_fresh_snapshot() {
        let mut replica = Replica::new();
        replica.apply(snapshot(vec![])).unwrap();
        replica.reset();
        assert!(!replica.is_synced());
        replica
            .apply(snapshot(vec![entry("10.0.0.1", 32, "10.0.0.254", "eth0")]))
            .unwrap();
        assert_eq!(replica.table().size(), 1);
    }
}
