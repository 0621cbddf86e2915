//! Error types for routing table operations

use crate::entry::address_to_string;
use thiserror::Error;

/// Result type alias for routing table operations.
pub type Result<T> = std::result::Result<T, TableError>;

/// Errors produced by routing table lookups and updates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// No entry exists for the requested destination address.
    #[error("no route entry for destination {}", fmt_addr(.destination))]
    NotFound {
        /// The destination address that was looked up.
        destination: u32,
    },
}

fn fmt_addr(addr: &u32) -> String {
    address_to_string(*addr)
}
