//! Single-byte tagged frames of the negotiation protocol.

use crate::error::{ProtocolError, ProtocolResult};
use crate::id::{ObjectId, OBJECT_ID_HEX_LEN};
use std::io::{Read, Write};

const TAG_QUERY: u8 = b'Q';
const TAG_YES: u8 = b'Y';
const TAG_NO: u8 = b'N';
const TAG_TRANSFER: u8 = b'T';
const TAG_GET: u8 = b'G';
const TAG_PUT: u8 = b'P';
const TAG_FLIP: u8 = b'F';

/// A negotiation frame.
///
/// Every frame starts with one ASCII tag byte. Only `Query` carries a
/// payload: the queried identifier as 40 hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Does the answering side have this object? (`Q` + id)
    Query(ObjectId),
    /// Answer to the oldest outstanding query (`Y` present, `N` absent).
    Answer(bool),
    /// End of negotiation; the slice payload follows (`T`).
    Transfer,
    /// Fetch selector: the initiator receives objects (`G`).
    Get,
    /// Fetch selector: the initiator sends objects (`P`).
    Put,
    /// Direction flip between the two halves of a bidirectional pair (`F`).
    Flip,
}

impl Frame {
    /// Returns the tag byte.
    pub fn tag(&self) -> u8 {
        match self {
            Frame::Query(_) => TAG_QUERY,
            Frame::Answer(true) => TAG_YES,
            Frame::Answer(false) => TAG_NO,
            Frame::Transfer => TAG_TRANSFER,
            Frame::Get => TAG_GET,
            Frame::Put => TAG_PUT,
            Frame::Flip => TAG_FLIP,
        }
    }

    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Frame::Query(_) => "query",
            Frame::Answer(_) => "answer",
            Frame::Transfer => "transfer",
            Frame::Get => "get",
            Frame::Put => "put",
            Frame::Flip => "flip",
        }
    }

    /// Writes the frame.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> ProtocolResult<()> {
        match self {
            Frame::Query(id) => {
                let mut buf = [0u8; 1 + OBJECT_ID_HEX_LEN];
                buf[0] = TAG_QUERY;
                buf[1..].copy_from_slice(id.to_hex().as_bytes());
                writer.write_all(&buf)?;
            }
            other => writer.write_all(&[other.tag()])?,
        }
        Ok(())
    }

    /// Reads one frame, failing on tags no frame uses.
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> ProtocolResult<Self> {
        let mut tag = [0u8; 1];
        reader.read_exact(&mut tag)?;
        match tag[0] {
            TAG_QUERY => {
                let mut raw = [0u8; OBJECT_ID_HEX_LEN];
                reader.read_exact(&mut raw)?;
                Ok(Frame::Query(ObjectId::from_hex_bytes(&raw)?))
            }
            TAG_YES => Ok(Frame::Answer(true)),
            TAG_NO => Ok(Frame::Answer(false)),
            TAG_TRANSFER => Ok(Frame::Transfer),
            TAG_GET => Ok(Frame::Get),
            TAG_PUT => Ok(Frame::Put),
            TAG_FLIP => Ok(Frame::Flip),
            other => Err(ProtocolError::UnknownTag { tag: other }),
        }
    }
}
