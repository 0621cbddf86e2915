//! Core types for the Routing Table Manager (RTM)
//!
//! Provides the L3 routing table entry and the in-memory routing table
//! shared by the RTM server daemon and its client replicas.

mod entry;
mod error;
mod render;
mod table;

pub use entry::{
    address_to_bytes, address_to_string, bytes_to_address, parse_address, RouteEntry,
    MAX_PREFIX_LEN,
};
pub use error::{Result, TableError};
pub use table::RoutingTable;
