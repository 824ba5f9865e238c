//! Control messages exchanged outside the negotiation frames.
//!
//! These carry the session preamble (which directory the remote side should
//! open) and the orchestration dialogue (repository lists and selection).
//! Each message is a big-endian `u32` length followed by CBOR.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Largest control message accepted from a peer.
pub const MAX_MESSAGE_LEN: usize = 16 * 1024 * 1024;

/// What the initiator wants from the remote side after opening a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Service {
    /// One repository, one direction, selected by a `G`/`P` frame.
    Fetch,
    /// Every repository under the root, both directions.
    Sync,
}

/// A control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMessage {
    /// Session preamble: the directory the remote side works in.
    Open {
        /// Repository (fetch) or repository root (sync) on the remote side.
        root: String,
        /// Requested service.
        service: Service,
    },
    /// The previous request was accepted.
    Ready,
    /// The previous request cannot be served.
    Unavailable {
        /// Human-readable reason.
        reason: String,
    },
    /// Revision names the remote side should resolve and send.
    Revisions(Vec<String>),
    /// Repositories discovered under the remote root.
    Repositories(Vec<String>),
    /// Start the bidirectional exchange for one repository.
    Select(String),
    /// No more repositories.
    Done,
}

impl ControlMessage {
    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ControlMessage::Open { .. } => "open",
            ControlMessage::Ready => "ready",
            ControlMessage::Unavailable { .. } => "unavailable",
            ControlMessage::Revisions(_) => "revisions",
            ControlMessage::Repositories(_) => "repositories",
            ControlMessage::Select(_) => "select",
            ControlMessage::Done => "done",
        }
    }

    /// Encodes to CBOR.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| ProtocolError::Codec(e.to_string()))?;
        Ok(bytes)
    }

    /// Decodes from CBOR.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        ciborium::from_reader(bytes).map_err(|e| ProtocolError::Codec(e.to_string()))
    }

    /// Writes the length-prefixed message.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> ProtocolResult<()> {
        let bytes = self.encode()?;
        if bytes.len() > MAX_MESSAGE_LEN {
            return Err(ProtocolError::MessageTooLarge {
                len: bytes.len(),
                limit: MAX_MESSAGE_LEN,
            });
        }
        writer.write_all(&(bytes.len() as u32).to_be_bytes())?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Reads one length-prefixed message.
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> ProtocolResult<Self> {
        let mut len = [0u8; 4];
        reader.read_exact(&mut len)?;
        let len = u32::from_be_bytes(len) as usize;
        if len > MAX_MESSAGE_LEN {
            return Err(ProtocolError::MessageTooLarge {
                len,
                limit: MAX_MESSAGE_LEN,
            });
        }
        let mut bytes = vec![0u8; len];
        reader.read_exact(&mut bytes)?;
        Self::decode(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_roundtrip() {
        let msg = ControlMessage::Open {
            root: "/srv/mirrors".into(),
            service: Service::Sync,
        };
        let mut buf = Vec::new();
        msg.write_to(&mut buf).unwrap();

        let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert_eq!(len, buf.len() - 4);
        assert_eq!(ControlMessage::read_from(&mut buf.as_slice()).unwrap(), msg);
    }

    #[test]
    fn messages_follow_each_other() {
        let first = ControlMessage::Repositories(vec!["a.git".into(), "team/b.git".into()]);
        let second = ControlMessage::Done;
        let mut buf = Vec::new();
        first.write_to(&mut buf).unwrap();
        second.write_to(&mut buf).unwrap();

        let mut reader = buf.as_slice();
        assert_eq!(ControlMessage::read_from(&mut reader).unwrap(), first);
        assert_eq!(ControlMessage::read_from(&mut reader).unwrap(), second);
        assert!(reader.is_empty());
    }

    #[test]
    fn oversized_length_rejected() {
        let mut buf = ((MAX_MESSAGE_LEN + 1) as u32).to_be_bytes().to_vec();
        buf.extend_from_slice(&[0u8; 8]);
        let err = ControlMessage::read_from(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
    }

    #[test]
    fn garbage_is_codec_error() {
        let err = ControlMessage::decode(&[0xff, 0x00, 0x13]).unwrap_err();
        assert!(matches!(err, ProtocolError::Codec(_)));
    }

    #[test]
    fn message_names() {
        assert_eq!(ControlMessage::Ready.name(), "ready");
        assert_eq!(ControlMessage::Select("x.git".into()).name(), "select");
    }
}
