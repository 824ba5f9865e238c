//! Handoff from negotiation to bulk transfer.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::negotiation::NegotiationOutcome;
use crate::transport::Channel;
use revsync_protocol::{Frame, ObjectId};
use revsync_store::ObjectStore;
use std::io::{Read, Write};

/// What to serialize once negotiation has finished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferPlan {
    /// Objects the peer lacks.
    pub include: Vec<ObjectId>,
    /// Objects the peer has.
    pub exclude: Vec<ObjectId>,
    /// Whether the payload may rely on the peer holding `exclude`.
    pub thin: bool,
}

impl TransferPlan {
    /// Partitions a negotiation outcome.
    pub fn new(outcome: &NegotiationOutcome, thin: bool) -> Self {
        Self {
            include: outcome.need.clone(),
            exclude: outcome.have.clone(),
            thin,
        }
    }

    /// Returns true if there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }
}

/// Writes `T` followed by the serialized slice. Returns payload bytes sent.
///
/// If the store fails, the payload is voided with the abort marker so the
/// peer stays aligned, and the store error is returned.
pub fn send_payload<S, R, W>(
    channel: &mut Channel<R, W>,
    store: &S,
    plan: &TransferPlan,
    config: &SyncConfig,
) -> SyncResult<u64>
where
    S: ObjectStore + ?Sized,
    R: Read,
    W: Write,
{
    channel.write_frame(&Frame::Transfer)?;
    let mut writer = channel.payload_writer(config.payload_chunk_size);
    match store.serialize_slice(&plan.include, &plan.exclude, plan.thin, &mut writer) {
        Ok(()) => {
            let bytes = writer.finish()?;
            tracing::debug!(bytes, include = plan.include.len(), "payload sent");
            Ok(bytes)
        }
        Err(e) => {
            tracing::warn!(error = %e, "serialization failed, aborting payload");
            writer.abort()?;
            Err(e.into())
        }
    }
}

/// Hands the payload following `T` to the store. Returns payload bytes read.
///
/// Unread chunks are drained after the store returns, so on success and on
/// store failure the channel is positioned right after the payload.
pub fn receive_payload<S, R, W>(channel: &mut Channel<R, W>, store: &S) -> SyncResult<u64>
where
    S: ObjectStore + ?Sized,
    R: Read,
    W: Write,
{
    let mut reader = channel.payload_reader()?;
    let result = store.materialize_slice(&mut reader);
    if reader.is_aborted() {
        return Err(SyncError::TransferAborted);
    }
    if !reader.is_finished() {
        reader.drain()?;
        if reader.is_aborted() {
            return Err(SyncError::TransferAborted);
        }
    }
    result?;
    tracing::debug!(bytes = reader.bytes_read(), "payload received");
    Ok(reader.bytes_read())
}

/// Writes `T` and a voided payload.
pub fn abort_payload<R: Read, W: Write>(channel: &mut Channel<R, W>) -> SyncResult<()> {
    channel.write_frame(&Frame::Transfer)?;
    channel.payload_writer(1).abort()?;
    Ok(())
}
