//! Routing Table Manager synchronization server
//!
//! Owns the authoritative L3 routing table and keeps every connected client
//! replica synchronized: a full snapshot at connect time, then one delta per
//! committed CUD operation. Operator commands arrive on the console; client
//! channels run over a Unix domain socket.

mod config;
pub mod console;
mod error;
mod registry;
mod server;
mod sync;

pub use config::{default_socket_path, ConfigFile, ServerConfig, DEFAULT_MAX_CLIENTS};
pub use error::{Result, ServerError};
pub use registry::{ClientId, ClientRegistry, ClientState};
pub use server::serve;
pub use sync::SyncServer;
