//! Tagged wire messages of the CUD synchronization protocol
//!
//! Every message is a one-byte kind tag followed by a body: a full table
//! encoding for snapshots, a single entry encoding for deltas, nothing for
//! the shutdown notice.

use std::fmt;

use rtm_types::{RouteEntry, RoutingTable};

use crate::codec::{decode_entry, decode_table, encode_entry, encode_table};
use crate::error::{CodecError, Result};

/// Message kind tag, the first byte of every wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    /// Full table state, sent once per client at connect time.
    Snapshot = 0,
    /// Single-entry create delta.
    Create = 1,
    /// Single-entry update delta.
    Update = 2,
    /// Single-entry delete delta.
    Delete = 3,
    /// Server is going away; empty body.
    Shutdown = 4,
}

impl MessageKind {
    /// Parse a kind byte; anything outside the tag set is rejected.
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Self::Snapshot),
            1 => Ok(Self::Create),
            2 => Ok(Self::Update),
            3 => Ok(Self::Delete),
            4 => Ok(Self::Shutdown),
            other => Err(CodecError::UnknownMessageKind(other)),
        }
    }

    /// The tag byte for this kind.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Returns true for the single-entry delta kinds.
    pub fn is_delta(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Snapshot => "snapshot",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// The three mutating table operations, as a closed variant set.
///
/// Kept separate from [`MessageKind`]: opcodes name table mutations, kinds
/// tag wire messages (snapshots and shutdown notices are not CUD
/// operations).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CudOp {
    /// Insert or overwrite an entry.
    Create,
    /// Replace an existing entry in place.
    Update,
    /// Remove an entry.
    Delete,
}

impl CudOp {
    /// The wire message kind carrying this operation's delta.
    pub fn kind(self) -> MessageKind {
        match self {
            Self::Create => MessageKind::Create,
            Self::Update => MessageKind::Update,
            Self::Delete => MessageKind::Delete,
        }
    }
}

impl fmt::Display for CudOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind().fmt(f)
    }
}

/// A decoded protocol message.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    /// Full table state.
    Snapshot(RoutingTable),
    /// A committed create, carrying the created entry.
    Create(RouteEntry),
    /// A committed update, carrying the new entry state.
    Update(RouteEntry),
    /// A committed delete, carrying the removed entry.
    Delete(RouteEntry),
    /// Server shutdown notice.
    Shutdown,
}

impl WireMessage {
    /// The kind tag of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Snapshot(_) => MessageKind::Snapshot,
            Self::Create(_) => MessageKind::Create,
            Self::Update(_) => MessageKind::Update,
            Self::Delete(_) => MessageKind::Delete,
            Self::Shutdown => MessageKind::Shutdown,
        }
    }

    /// Encode this message: kind byte followed by the body.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Snapshot(table) => Self::snapshot_bytes(table),
            Self::Create(entry) => Self::delta_bytes(CudOp::Create, entry),
            Self::Update(entry) => Self::delta_bytes(CudOp::Update, entry),
            Self::Delete(entry) => Self::delta_bytes(CudOp::Delete, entry),
            Self::Shutdown => Self::shutdown_bytes(),
        }
    }

    /// Encode a snapshot directly from a table reference.
    pub fn snapshot_bytes(table: &RoutingTable) -> Vec<u8> {
        let body = encode_table(table);
        let mut buf = Vec::with_capacity(1 + body.len());
        buf.push(MessageKind::Snapshot.as_byte());
        buf.extend_from_slice(&body);
        buf
    }

    /// Encode a single-entry delta for the given operation.
    pub fn delta_bytes(op: CudOp, entry: &RouteEntry) -> Vec<u8> {
        let body = encode_entry(entry);
        let mut buf = Vec::with_capacity(1 + body.len());
        buf.push(op.kind().as_byte());
        buf.extend_from_slice(&body);
        buf
    }

    /// Encode a shutdown notice.
    pub fn shutdown_bytes() -> Vec<u8> {
        vec![MessageKind::Shutdown.as_byte()]
    }

    /// Decode one message from the front of `buf`, returning it and the
    /// number of bytes consumed.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.is_empty() {
            return Err(CodecError::TruncatedInput {
                needed: 1,
                available: 0,
            });
        }
        let kind = MessageKind::from_byte(buf[0])?;
        if kind == MessageKind::Shutdown {
            return Ok((Self::Shutdown, 1));
        }
        let (message, used) = Self::decode_tagged_body(kind, &buf[1..], false)?;
        Ok((message, 1 + used))
    }

    /// Decode a message body whose kind byte was already consumed. The body
    /// slice must contain exactly one message.
    pub(crate) fn decode_body(kind: MessageKind, body: &[u8]) -> Result<Self> {
        let (message, _) = Self::decode_tagged_body(kind, body, true)?;
        Ok(message)
    }

    fn decode_tagged_body(kind: MessageKind, body: &[u8], exact: bool) -> Result<(Self, usize)> {
        let (message, used) = match kind {
            MessageKind::Snapshot => {
                let (table, used) = decode_table(body)?;
                (Self::Snapshot(table), used)
            }
            MessageKind::Create => {
                let (entry, used) = decode_entry(body)?;
                (Self::Create(entry), used)
            }
            MessageKind::Update => {
                let (entry, used) = decode_entry(body)?;
                (Self::Update(entry), used)
            }
            MessageKind::Delete => {
                let (entry, used) = decode_entry(body)?;
                (Self::Delete(entry), used)
            }
            MessageKind::Shutdown => (Self::Shutdown, 0),
        };
        if exact && used != body.len() {
            return Err(CodecError::MalformedLength {
                field: "message body",
                declared: body.len(),
                expected: used,
            });
        }
        Ok((message, used))
    }
}
