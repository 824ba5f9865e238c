//! Error types for the sync engine.

use revsync_protocol::ProtocolError;
use revsync_store::StoreError;
use std::io;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A root or peer message carried text that is not an object identifier.
    #[error("invalid object identifier: {0:?}")]
    InvalidIdentifier(String),

    /// The channel failed or closed.
    #[error("channel error: {0}")]
    Channel(#[from] io::Error),

    /// The peer sent something the protocol does not allow at this point.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The local object store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The peer voided the payload it was sending.
    #[error("transfer aborted by peer")]
    TransferAborted,

    /// Repository discovery failed.
    #[error("repository discovery failed: {0}")]
    Discovery(String),

    /// The peer (or local side) cannot serve a repository.
    #[error("repository {name} unavailable: {reason}")]
    RepositoryUnavailable {
        /// Repository name or path.
        name: String,
        /// Reason given.
        reason: String,
    },

    /// Control message encoding failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// A failure in the middle of an exchange, after which the peer's
    /// position in the stream is unknown.
    #[error("session interrupted: {0}")]
    Interrupted(Box<SyncError>),
}

impl SyncError {
    /// Creates a protocol violation error.
    pub fn violation(message: impl Into<String>) -> Self {
        Self::ProtocolViolation(message.into())
    }

    /// Creates a violation for a frame or message that arrived out of turn.
    pub fn unexpected(expected: &'static str, found: &str) -> Self {
        ProtocolError::unexpected(expected, found).into()
    }

    /// Creates a repository unavailable error.
    pub fn unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RepositoryUnavailable {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Marks an error as having left the stream in an unknown position.
    pub fn interrupted(self) -> Self {
        match self {
            already @ SyncError::Interrupted(_) => already,
            other => SyncError::Interrupted(Box::new(other)),
        }
    }

    /// Returns true if no further byte on the channel can be trusted.
    pub fn misaligns_channel(&self) -> bool {
        matches!(
            self,
            SyncError::Channel(_)
                | SyncError::ProtocolViolation(_)
                | SyncError::Codec(_)
                | SyncError::Interrupted(_)
        )
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::InvalidIdentifier { input } => SyncError::InvalidIdentifier(input),
            ProtocolError::Io(e) => SyncError::Channel(e),
            ProtocolError::Codec(message) => SyncError::Codec(message),
            other => SyncError::ProtocolViolation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misaligning_errors() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "closed");
        assert!(SyncError::Channel(eof).misaligns_channel());
        assert!(SyncError::violation("bad tag").misaligns_channel());
        assert!(SyncError::TransferAborted.interrupted().misaligns_channel());

        assert!(!SyncError::TransferAborted.misaligns_channel());
        assert!(!SyncError::InvalidIdentifier("HEAD".into()).misaligns_channel());
        assert!(!SyncError::Store(StoreError::Corrupted("x".into())).misaligns_channel());
        assert!(!SyncError::unavailable("a.git", "missing").misaligns_channel());
    }

    #[test]
    fn protocol_errors_convert() {
        let err: SyncError = ProtocolError::UnknownTag { tag: b'Z' }.into();
        assert!(matches!(err, SyncError::ProtocolViolation(_)));

        let err = SyncError::unexpected("answer", "transfer");
        assert!(err.misaligns_channel());
        assert_eq!(
            err.to_string(),
            "protocol violation: expected answer, found transfer"
        );

        let err: SyncError = ProtocolError::invalid_identifier("abc").into();
        assert!(matches!(err, SyncError::InvalidIdentifier(ref s) if s == "abc"));

        let err: SyncError = ProtocolError::Io(io::ErrorKind::BrokenPipe.into()).into();
        assert!(matches!(err, SyncError::Channel(_)));
    }

    #[test]
    fn interrupted_does_not_nest() {
        let err = SyncError::TransferAborted.interrupted().interrupted();
        match err {
            SyncError::Interrupted(inner) => {
                assert!(matches!(*inner, SyncError::TransferAborted));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn error_display() {
        let err = SyncError::unavailable("x.git", "not found");
        assert_eq!(err.to_string(), "repository x.git unavailable: not found");
    }
}
