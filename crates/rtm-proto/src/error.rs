//! Error types for the wire codec and protocol framing

use thiserror::Error;

/// Result type alias for codec and framing operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors produced while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The input buffer ended before a declared field did.
    #[error("input truncated: need {needed} bytes, {available} available")]
    TruncatedInput {
        /// Bytes the current field requires.
        needed: usize,
        /// Bytes actually remaining.
        available: usize,
    },

    /// A declared length does not match the data it describes.
    #[error("length mismatch in {field}: declared {declared}, expected {expected}")]
    MalformedLength {
        /// The field whose length accounting is inconsistent.
        field: &'static str,
        /// The length the record declared.
        declared: usize,
        /// The length the data requires.
        expected: usize,
    },

    /// Interface name bytes are not valid UTF-8.
    #[error("interface name is not valid UTF-8: {0}")]
    MalformedInterface(#[from] std::str::Utf8Error),

    /// A message carried a kind byte outside the protocol's tag set.
    #[error("unknown message kind byte {0:#04x}")]
    UnknownMessageKind(u8),

    /// A message declared a body larger than the framing limit allows.
    #[error("message body of {declared} bytes exceeds limit of {limit}")]
    OversizedMessage {
        /// The length the message declared.
        declared: usize,
        /// The framing limit.
        limit: usize,
    },

    /// Underlying I/O failure on the byte stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Returns true if the error indicates malformed peer data rather than
    /// a transport failure.
    pub fn is_protocol_error(&self) -> bool {
        !matches!(self, CodecError::Io(_))
    }
}
