//! Error types for the RTM server daemon

use thiserror::Error;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that can occur while running the sync server.
///
/// Only listener-level failures are fatal; anything scoped to a single
/// client retires that client and is logged, never propagated here.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Listening endpoint could not be created or accepted on.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file or value problem.
    #[error("configuration error: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },

    /// A new connection arrived while the client set was full.
    #[error("client limit of {limit} reached")]
    ClientLimit {
        /// The configured limit.
        limit: usize,
    },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
