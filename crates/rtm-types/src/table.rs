//! In-memory L3 routing table keyed by destination address
//!
//! The key is the destination address alone, not destination+mask: a second
//! route to the same destination with a different mask replaces the first.
//! Iteration is in ascending key order, which keeps serialization and
//! rendering deterministic.

use std::collections::BTreeMap;

use crate::entry::RouteEntry;
use crate::error::{Result, TableError};

/// Keyed store of route entries.
///
/// Equality compares the full key set and, for every key, the full entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    entries: BTreeMap<u32, RouteEntry>,
}

impl RoutingTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert or overwrite the entry at `entry.destination`.
    ///
    /// Last write wins on an existing destination; the previous entry, if
    /// any, is returned.
    pub fn create_entry(&mut self, entry: RouteEntry) -> Option<RouteEntry> {
        self.entries.insert(entry.destination, entry)
    }

    /// Replace mask, gateway and interface of the entry keyed by
    /// `entry.destination`.
    ///
    /// Unlike [`create_entry`](Self::create_entry) this never creates a
    /// mapping: updating an absent destination is an error.
    pub fn update_entry(&mut self, entry: RouteEntry) -> Result<()> {
        match self.entries.get_mut(&entry.destination) {
            Some(existing) => {
                *existing = entry;
                Ok(())
            }
            None => Err(TableError::NotFound {
                destination: entry.destination,
            }),
        }
    }

    /// Remove the entry keyed by `destination`.
    ///
    /// Removing an absent key is a no-op; the removed entry, if any, is
    /// returned.
    pub fn delete_entry(&mut self, destination: u32) -> Option<RouteEntry> {
        self.entries.remove(&destination)
    }

    /// Look up the entry for `destination`.
    pub fn get(&self, destination: u32) -> Result<&RouteEntry> {
        self.entries
            .get(&destination)
            .ok_or(TableError::NotFound { destination })
    }

    /// Returns true if an entry exists for `destination`.
    pub fn contains(&self, destination: u32) -> bool {
        self.entries.contains_key(&destination)
    }

    /// Number of entries in the table.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over entries in ascending destination order.
    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.values()
    }
}

impl FromIterator<RouteEntry> for RoutingTable {
    fn from_iter<I: IntoIterator<Item = RouteEntry>>(iter: I) -> Self {
        let mut table = Self::new();
        for entry in iter {
            table.create_entry(entry);
        }
        table
    }
}
