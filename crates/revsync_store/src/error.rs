//! Error types for object store operations.

use revsync_protocol::{ObjectId, ProtocolError};
use std::io;
use thiserror::Error;

/// Result type for object store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during object store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store does not hold a requested object.
    #[error("object not found: {0}")]
    MissingObject(ObjectId),

    /// A serialized slice or store file is damaged.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// An external store command exited unsuccessfully.
    #[error("command `{command}` failed: {status}")]
    CommandFailed {
        /// The command line that ran.
        command: String,
        /// Exit status description.
        status: String,
    },

    /// The store produced or was given text that is not an object ID.
    #[error("invalid identifier from store: {0:?}")]
    InvalidIdentifier(String),

    /// The repository location cannot be used as a store.
    #[error("not a repository: {0}")]
    NotARepository(String),
}

impl StoreError {
    /// Creates a command failure error.
    pub fn command_failed(command: impl Into<String>, status: impl ToString) -> Self {
        Self::CommandFailed {
            command: command.into(),
            status: status.to_string(),
        }
    }
}

impl From<ProtocolError> for StoreError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidIdentifier { input } => StoreError::InvalidIdentifier(input),
            ProtocolError::Io(e) => StoreError::Io(e),
            other => StoreError::Corrupted(other.to_string()),
        }
    }
}
