//! Wire codec and sync protocol messages for the Routing Table Manager
//!
//! Defines the length-prefixed binary encoding of route entries and whole
//! tables, the tagged message set of the CUD synchronization protocol, and
//! framed async message I/O over a byte stream.

mod codec;
mod error;
mod frame;
mod message;

pub use codec::{decode_entry, decode_table, encode_entry, encode_table, encoded_entry_len};
pub use error::{CodecError, Result};
pub use frame::{read_message, write_message, MAX_BODY_LEN};
pub use message::{CudOp, MessageKind, WireMessage};
