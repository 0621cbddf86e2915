//! Routing Table Manager client replica
//!
//! Holds a private copy of the server's routing table and keeps it
//! eventually consistent by applying the connect-time snapshot followed by
//! per-operation deltas. A client that loses its channel does not attempt
//! incremental repair; it reconnects and resyncs from a fresh snapshot.

mod error;
mod replica;
mod session;

pub use error::{ClientError, Result};
pub use replica::{Applied, Replica};
pub use session::{ClientSession, SessionEnd};
