//! # revsync Protocol
//!
//! Wire types for revsync object negotiation.
//!
//! This crate provides:
//! - `ObjectId` and `RootSet` for content-hash identifiers
//! - `ObjectStatus` for negotiation classification
//! - `Frame` for the single-byte tagged negotiation frames
//! - `ControlMessage` for the session preamble and orchestration dialogue
//! - `PayloadWriter` / `PayloadReader` for chunked bulk payloads
//!
//! This crate only encodes and decodes; it never touches an object store.
//!
//! ## Wire summary
//!
//! | Bytes | Meaning |
//! |---|---|
//! | `Q` + 40 hex chars | existence query |
//! | `Y` / `N` | present / absent |
//! | `T` | end of negotiation, payload chunks follow |
//! | `G` / `P` | fetch role selector |
//! | `F` | direction flip inside a bidirectional pair |

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod frame;
mod id;
mod messages;
mod payload;
mod status;

pub use error::{ProtocolError, ProtocolResult};
pub use frame::Frame;
pub use id::{ObjectId, RootSet, OBJECT_ID_HEX_LEN, OBJECT_ID_LEN};
pub use messages::{ControlMessage, Service, MAX_MESSAGE_LEN};
pub use payload::{
    PayloadReader, PayloadWriter, ABORT_MARKER, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE,
};
pub use status::ObjectStatus;
