//! Routing table entry type and IPv4 address conversions
//!
//! Addresses are carried as `u32` values whose numeric value is the
//! big-endian interpretation of the dotted quad, matching
//! `std::net::Ipv4Addr`: `10.0.0.1` is `0x0a00_0001`. All conversions go
//! through the explicit function pair below; no layout aliasing anywhere.

use std::fmt;
use std::net::Ipv4Addr;

/// Widest CIDR prefix length for IPv4.
pub const MAX_PREFIX_LEN: u8 = 32;

/// Convert an address value to its dotted-quad byte form.
#[inline]
pub fn address_to_bytes(addr: u32) -> [u8; 4] {
    addr.to_be_bytes()
}

/// Convert dotted-quad bytes back to the address value.
#[inline]
pub fn bytes_to_address(octets: [u8; 4]) -> u32 {
    u32::from_be_bytes(octets)
}

/// Format an address value as a dotted-quad string.
pub fn address_to_string(addr: u32) -> String {
    Ipv4Addr::from(addr).to_string()
}

/// Parse a dotted-quad string into an address value.
///
/// Returns `None` for anything `Ipv4Addr` does not accept.
pub fn parse_address(s: &str) -> Option<u32> {
    s.parse::<Ipv4Addr>().ok().map(u32::from)
}

/// A single L3 routing table entry.
///
/// The destination address doubles as the table key: two entries with the
/// same destination cannot coexist, regardless of mask. Two entries are
/// equal iff all four fields match exactly, including the interface name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    /// Destination IPv4 address; also the table key.
    pub destination: u32,
    /// CIDR prefix length, 0-32.
    pub mask: u8,
    /// Next-hop gateway IPv4 address.
    pub gateway: u32,
    /// Output interface name (e.g. "eth0").
    pub interface: String,
}

impl RouteEntry {
    /// Create a new route entry.
    pub fn new(destination: u32, mask: u8, gateway: u32, interface: impl Into<String>) -> Self {
        debug_assert!(mask <= MAX_PREFIX_LEN);
        Self {
            destination,
            mask,
            gateway,
            interface: interface.into(),
        }
    }

    /// Destination formatted as `a.b.c.d/len`.
    pub fn destination_prefix(&self) -> String {
        format!("{}/{}", address_to_string(self.destination), self.mask)
    }

    /// Payload size in bytes: both addresses, the mask and the interface
    /// name, without any framing.
    pub fn payload_len(&self) -> usize {
        4 + 4 + 1 + self.interface.len()
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} via {} dev {}",
            self.destination_prefix(),
            address_to_string(self.gateway),
            self.interface
        )
    }
}
