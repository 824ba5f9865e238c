//! Breadth-first existence negotiation.
//!
//! The requester walks the ancestry of its roots, asking the fulfiller
//! whether it has each object. Answers come back in query order, so a whole
//! frontier can be in flight at once. Ancestors of an object the fulfiller
//! has are never asked about: by closure, the fulfiller has them too.

use crate::error::{SyncError, SyncResult};
use crate::transport::Channel;
use revsync_protocol::{Frame, ObjectId, ObjectStatus, RootSet};
use revsync_store::ObjectStore;
use std::collections::{BTreeMap, VecDeque};
use std::io::{Read, Write};

/// The classified result of a negotiation, in identifier order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiationOutcome {
    /// Objects the fulfiller has.
    pub have: Vec<ObjectId>,
    /// Objects the fulfiller lacks.
    pub need: Vec<ObjectId>,
}

/// Requester-side negotiation state.
///
/// Every object moves `Unknown -> Asked -> {Have, Need}` and is queried at
/// most once.
#[derive(Debug, Default)]
pub struct NegotiationSession {
    statuses: BTreeMap<ObjectId, ObjectStatus>,
    pending: VecDeque<ObjectId>,
    queries_sent: usize,
}

impl NegotiationSession {
    /// Creates an empty negotiation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the status of an object.
    pub fn status(&self, id: &ObjectId) -> ObjectStatus {
        self.statuses.get(id).copied().unwrap_or_default()
    }

    /// Number of queries whose answers have not been read.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Number of queries written so far.
    pub fn queries_sent(&self) -> usize {
        self.queries_sent
    }

    /// Negotiates the ancestry of `roots` against the peer.
    ///
    /// On a store failure the failing object's answer has been consumed but
    /// other queries may still be outstanding; call [`drain`](Self::drain)
    /// before writing anything else.
    ///
    /// # Errors
    ///
    /// Returns `Channel` on I/O failure, `ProtocolViolation` if the peer
    /// sends anything but an answer, and `Store` if parents cannot be listed.
    pub fn run<S, R, W>(
        &mut self,
        roots: &RootSet,
        store: &S,
        channel: &mut Channel<R, W>,
    ) -> SyncResult<()>
    where
        S: ObjectStore + ?Sized,
        R: Read,
        W: Write,
    {
        for root in roots {
            self.ask(channel, *root)?;
        }

        while let Some(id) = self.pending.pop_front() {
            let status = ObjectStatus::answered(read_answer(channel)?);
            self.statuses.insert(id, status);
            tracing::debug!(%id, ?status, "classified");

            if status == ObjectStatus::Need {
                for parent in store.immediate_parents(&id)? {
                    self.ask(channel, parent)?;
                }
            }
        }
        Ok(())
    }

    /// Reads answers for all outstanding queries without descending further.
    ///
    /// # Errors
    ///
    /// Returns `Channel` or `ProtocolViolation` as for [`run`](Self::run).
    pub fn drain<R: Read, W: Write>(&mut self, channel: &mut Channel<R, W>) -> SyncResult<()> {
        while let Some(id) = self.pending.pop_front() {
            let status = ObjectStatus::answered(read_answer(channel)?);
            self.statuses.insert(id, status);
        }
        Ok(())
    }

    /// Consumes the session, returning the classified objects.
    pub fn into_outcome(self) -> NegotiationOutcome {
        let mut outcome = NegotiationOutcome::default();
        for (id, status) in self.statuses {
            match status {
                ObjectStatus::Have => outcome.have.push(id),
                ObjectStatus::Need => outcome.need.push(id),
                ObjectStatus::Unknown | ObjectStatus::Asked => {}
            }
        }
        outcome
    }

    fn ask<R: Read, W: Write>(&mut self, channel: &mut Channel<R, W>, id: ObjectId) -> SyncResult<()> {
        if !self.status(&id).can_ask() {
            return Ok(());
        }
        self.statuses.insert(id, ObjectStatus::Asked);
        self.pending.push_back(id);
        channel.write_frame(&Frame::Query(id))?;
        self.queries_sent += 1;
        Ok(())
    }
}

fn read_answer<R: Read, W: Write>(channel: &mut Channel<R, W>) -> SyncResult<bool> {
    match channel.read_frame()? {
        Frame::Answer(present) => Ok(present),
        other => Err(SyncError::unexpected("answer", other.name())),
    }
}
