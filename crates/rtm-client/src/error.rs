//! Error types for the client replica

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur on a client session.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure on the server channel.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed bytes from the server.
    #[error("codec error: {0}")]
    Codec(#[from] rtm_proto::CodecError),

    /// The server sent a message the protocol does not allow here.
    #[error("protocol violation: {message}")]
    ProtocolViolation {
        /// What arrived out of order.
        message: String,
    },
}

impl ClientError {
    /// Creates a protocol violation error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_violation_display() {
        let err = ClientError::protocol("delta before snapshot");
        assert_eq!(err.to_string(), "protocol violation: delta before snapshot");
    }
}
