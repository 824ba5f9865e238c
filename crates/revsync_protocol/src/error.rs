//! Error types for the protocol crate.

use std::io;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Text that is not a 40-character hexadecimal object identifier.
    #[error("invalid object identifier: {input:?}")]
    InvalidIdentifier {
        /// The rejected input.
        input: String,
    },

    /// A frame tag byte that no frame uses.
    #[error("unknown frame tag 0x{tag:02x}")]
    UnknownTag {
        /// The tag byte read from the stream.
        tag: u8,
    },

    /// A frame or control message arrived where a different one was required.
    #[error("expected {expected}, found {found}")]
    UnexpectedFrame {
        /// What the reader was waiting for.
        expected: &'static str,
        /// What actually arrived.
        found: String,
    },

    /// A control message length prefix above the accepted maximum.
    #[error("control message of {len} bytes exceeds limit of {limit} bytes")]
    MessageTooLarge {
        /// Declared message length.
        len: usize,
        /// Maximum accepted length.
        limit: usize,
    },

    /// CBOR encoding or decoding of a control message failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// The underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// Creates an invalid identifier error.
    pub fn invalid_identifier(input: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            input: input.into(),
        }
    }

    /// Creates an unexpected frame error.
    pub fn unexpected(expected: &'static str, found: impl Into<String>) -> Self {
        Self::UnexpectedFrame {
            expected,
            found: found.into(),
        }
    }

    /// Returns true if the error came from the stream rather than its content.
    pub fn is_io(&self) -> bool {
        matches!(self, ProtocolError::Io(_))
    }
}
