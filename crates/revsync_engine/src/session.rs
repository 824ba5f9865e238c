//! One repository, one or both directions.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::handoff::{self, TransferPlan};
use crate::negotiation::NegotiationSession;
use crate::transport::Channel;
use revsync_protocol::{Frame, RootSet};
use revsync_store::ObjectStore;
use std::io::{Read, Write};

/// Which half of a directional session this side plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Asks about objects and sends the payload.
    Requester,
    /// Answers from its store and receives the payload.
    Fulfiller,
}

/// Which end of a bidirectional exchange this side is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Requests first, then fulfills after the flip.
    Initiator,
    /// Fulfills first, then writes the flip and requests.
    Responder,
}

/// Counters for one directional session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferStats {
    /// Role played.
    pub role: Role,
    /// Queries sent (requester) or answered (fulfiller).
    pub queries: usize,
    /// Objects the fulfiller had.
    pub have: usize,
    /// Objects the fulfiller lacked.
    pub need: usize,
    /// Payload bytes sent or received.
    pub payload_bytes: u64,
}

impl TransferStats {
    /// Creates zeroed stats for a role.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            queries: 0,
            have: 0,
            need: 0,
            payload_bytes: 0,
        }
    }
}

/// Counters for both directions of an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeStats {
    /// Local objects pushed to the peer.
    pub sent: TransferStats,
    /// Peer objects pulled into the local store.
    pub received: TransferStats,
}

/// Runs negotiation and transfer for one repository.
///
/// The same session can play either role; the channel decides which side
/// speaks when.
#[derive(Debug)]
pub struct RepositorySession<S: ObjectStore> {
    store: S,
    config: SyncConfig,
}

impl<S: ObjectStore> RepositorySession<S> {
    /// Creates a session over a store.
    pub fn new(store: S, config: SyncConfig) -> Self {
        Self { store, config }
    }

    /// Returns the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Sends the part of the ancestry of `roots` the peer lacks.
    ///
    /// # Errors
    ///
    /// Store failures abort the session gracefully: outstanding answers are
    /// read, and `T` plus a voided payload are written, so the channel stays
    /// usable. Channel and protocol errors leave it unusable.
    pub fn request<R: Read, W: Write>(
        &self,
        channel: &mut Channel<R, W>,
        roots: &RootSet,
    ) -> SyncResult<TransferStats> {
        let mut negotiation = NegotiationSession::new();
        if let Err(e) = negotiation.run(roots, &self.store, channel) {
            return Err(abort_request(channel, &mut negotiation, e));
        }

        let mut stats = TransferStats::new(Role::Requester);
        stats.queries = negotiation.queries_sent();
        let outcome = negotiation.into_outcome();
        stats.have = outcome.have.len();
        stats.need = outcome.need.len();
        tracing::info!(
            roots = roots.len(),
            queries = stats.queries,
            have = stats.have,
            need = stats.need,
            "negotiation finished"
        );

        let plan = TransferPlan::new(&outcome, self.config.thin);
        stats.payload_bytes = handoff::send_payload(channel, &self.store, &plan, &self.config)?;
        Ok(stats)
    }

    /// Resolves revision names through the store and requests them.
    ///
    /// # Errors
    ///
    /// A name that does not resolve to a valid identifier fails with
    /// `InvalidIdentifier` (or `Store`) before any query is sent; the peer
    /// sees an aborted transfer.
    pub fn request_revisions<R: Read, W: Write>(
        &self,
        channel: &mut Channel<R, W>,
        revs: &[String],
    ) -> SyncResult<TransferStats> {
        let roots = self
            .store
            .resolve(revs)
            .map_err(SyncError::from)
            .and_then(|resolved| RootSet::parse(&resolved).map_err(SyncError::from));
        match roots {
            Ok(roots) => self.request(channel, &roots),
            Err(e) => Err(abort_request(channel, &mut NegotiationSession::new(), e)),
        }
    }

    /// Answers queries from the store, then materializes the payload.
    ///
    /// # Errors
    ///
    /// `TransferAborted` if the peer voided its payload. A store failure
    /// while answering leaves the peer waiting and is reported as
    /// `Interrupted`.
    pub fn fulfill<R: Read, W: Write>(&self, channel: &mut Channel<R, W>) -> SyncResult<TransferStats> {
        let mut stats = TransferStats::new(Role::Fulfiller);
        loop {
            let frame = channel.read_frame().map_err(|e| match e {
                SyncError::InvalidIdentifier(text) => {
                    SyncError::violation(format!("malformed query {text:?}"))
                }
                other => other,
            })?;
            match frame {
                Frame::Query(id) => {
                    let answers = self
                        .store
                        .exists_all(&[id])
                        .map_err(|e| SyncError::from(e).interrupted())?;
                    let present = matches!(answers.as_slice(), [true]);
                    stats.queries += 1;
                    if present {
                        stats.have += 1;
                    } else {
                        stats.need += 1;
                    }
                    tracing::debug!(%id, present, "answered");
                    channel.write_frame(&Frame::Answer(present))?;
                }
                Frame::Transfer => {
                    stats.payload_bytes = handoff::receive_payload(channel, &self.store)?;
                    tracing::info!(
                        queries = stats.queries,
                        need = stats.need,
                        bytes = stats.payload_bytes,
                        "transfer received"
                    );
                    return Ok(stats);
                }
                other => {
                    return Err(SyncError::unexpected("query or transfer", other.name()));
                }
            }
        }
    }

    /// Runs both directions over one channel.
    ///
    /// The initiator requests with `roots`, reads `F`, and fulfills; the
    /// responder fulfills, writes `F`, and requests with its own `roots`.
    /// A failure in the first half that keeps the channel aligned does not
    /// stop the second half; the first error is returned afterwards.
    pub fn exchange<R: Read, W: Write>(
        &self,
        channel: &mut Channel<R, W>,
        roots: &RootSet,
        side: Side,
    ) -> SyncResult<ExchangeStats> {
        let first = match side {
            Side::Initiator => self.request(channel, roots),
            Side::Responder => self.fulfill(channel),
        };
        let first = match first {
            Err(e) if e.misaligns_channel() => return Err(e),
            other => other,
        };
        if let Err(e) = &first {
            tracing::warn!(error = %e, "first half of exchange failed");
        }

        let second = match side {
            Side::Initiator => channel
                .expect_frame(Frame::Flip)
                .and_then(|()| self.fulfill(channel)),
            Side::Responder => channel
                .write_frame(&Frame::Flip)
                .and_then(|()| self.request(channel, roots)),
        };

        let (first, second) = (first?, second?);
        Ok(match side {
            Side::Initiator => ExchangeStats {
                sent: first,
                received: second,
            },
            Side::Responder => ExchangeStats {
                sent: second,
                received: first,
            },
        })
    }
}

/// Leaves the channel aligned after a requester failure, if possible.
fn abort_request<R: Read, W: Write>(
    channel: &mut Channel<R, W>,
    negotiation: &mut NegotiationSession,
    err: SyncError,
) -> SyncError {
    if err.misaligns_channel() {
        return err;
    }
    tracing::warn!(error = %err, pending = negotiation.pending(), "aborting request");
    if let Err(drain_err) = negotiation.drain(channel) {
        return drain_err;
    }
    if let Err(abort_err) = handoff::abort_payload(channel) {
        return abort_err;
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{memory_duplex, MemoryChannel};
    use revsync_protocol::ObjectId;
    use revsync_store::{InMemoryStore, StoreError};
    use revsync_testkit::GraphBuilder;
    use std::sync::Arc;

    fn roots_of(ids: &[ObjectId]) -> RootSet {
        ids.iter().copied().collect()
    }

    /// Runs `request` on one side and `fulfill` on the other.
    fn push(
        from: &Arc<InMemoryStore>,
        to: &Arc<InMemoryStore>,
        roots: &RootSet,
    ) -> (SyncResult<TransferStats>, SyncResult<TransferStats>) {
        let (mut a, mut b) = memory_duplex();
        std::thread::scope(|scope| {
            let receiver = scope.spawn(move || {
                RepositorySession::new(Arc::clone(to), SyncConfig::new()).fulfill(&mut b)
            });
            let sent = RepositorySession::new(Arc::clone(from), SyncConfig::new()).request(&mut a, roots);
            (sent, receiver.join().unwrap())
        })
    }

    #[test]
    fn request_sends_missing_objects() {
        let mut local = GraphBuilder::new();
        local.commit("a", &[]);
        local.commit("b", &["a"]);
        local.commit("c", &["b"]);
        let mut remote = GraphBuilder::new();
        remote.commit("a", &[]);

        let roots = roots_of(&local.ids(&["c"]));
        let (sent, received) = push(local.store(), remote.store(), &roots);
        let sent = sent.unwrap();
        let received = received.unwrap();

        assert_eq!(sent.queries, 3);
        assert_eq!(sent.need, 2);
        assert_eq!(sent.have, 1);
        assert_eq!(received.queries, 3);
        assert_eq!(received.payload_bytes, sent.payload_bytes);
        assert!(remote.store().contains(&local.id("c")));
    }

    #[test]
    fn second_request_is_a_no_op() {
        let mut local = GraphBuilder::new();
        local.commit("a", &[]);
        local.commit("b", &["a"]);
        let remote = GraphBuilder::new();
        let roots = roots_of(&local.ids(&["b"]));

        push(local.store(), remote.store(), &roots).0.unwrap();
        let (sent, received) = push(local.store(), remote.store(), &roots);
        let sent = sent.unwrap();
        assert_eq!(sent.need, 0);
        assert_eq!(sent.queries, 1);
        assert_eq!(sent.payload_bytes, 0);
        assert_eq!(received.unwrap().payload_bytes, 0);
    }

    #[test]
    fn invalid_revision_is_rejected_before_any_query() {
        let mut local = GraphBuilder::new();
        let valid = local.commit("main", &[]);
        let peer = InMemoryStore::new();
        let (mut a, mut b) = memory_duplex();

        // The valid name comes first; it must not be queried either.
        let revs = [valid.to_hex(), "not-a-revision".to_string()];
        let err = RepositorySession::new(Arc::clone(local.store()), SyncConfig::new())
            .request_revisions(&mut a, &revs)
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidIdentifier(ref s) if s == "not-a-revision"));

        // Nothing but the aborted handoff reached the wire.
        assert_eq!(b.read_frame().unwrap(), Frame::Transfer);
        assert!(matches!(
            handoff::receive_payload(&mut b, &peer),
            Err(SyncError::TransferAborted)
        ));
        drop(a);
        assert!(matches!(b.read_frame(), Err(SyncError::Channel(_))));
        assert!(peer.is_empty());
    }

    #[test]
    fn revisions_resolve_through_refs() {
        let mut local = GraphBuilder::new();
        local.commit("main", &[]);
        let remote = Arc::new(InMemoryStore::new());
        let (mut a, mut b) = memory_duplex();
        let target = Arc::clone(&remote);
        std::thread::scope(|scope| {
            let receiver =
                scope.spawn(move || RepositorySession::new(target, SyncConfig::new()).fulfill(&mut b));
            RepositorySession::new(Arc::clone(local.store()), SyncConfig::new())
                .request_revisions(&mut a, &["refs/heads/main".to_string()])
                .unwrap();
            receiver.join().unwrap().unwrap();
        });
        assert!(remote.contains(&local.id("main")));
    }

    #[test]
    fn store_failure_mid_negotiation_aborts_gracefully() {
        let local = Arc::new(InMemoryStore::new());
        let remote = Arc::new(InMemoryStore::new());
        // A root the local store does not hold: parents cannot be listed.
        let ghost = ObjectId::from_bytes([3; 20]);
        let (sent, received) = push(&local, &remote, &roots_of(&[ghost]));
        assert!(matches!(
            sent,
            Err(SyncError::Store(StoreError::MissingObject(_)))
        ));
        assert!(matches!(received, Err(SyncError::TransferAborted)));
    }

    #[test]
    fn fulfill_rejects_unexpected_frame() {
        let store = InMemoryStore::new();
        let (mut a, mut b): (MemoryChannel, MemoryChannel) = memory_duplex();
        a.write_frame(&Frame::Get).unwrap();
        a.flush().unwrap();
        let err = RepositorySession::new(&store, SyncConfig::new())
            .fulfill(&mut b)
            .unwrap_err();
        assert!(matches!(err, SyncError::ProtocolViolation(_)));
    }

    #[test]
    fn fulfill_rejects_unknown_tag() {
        let store = InMemoryStore::new();
        let mut channel = Channel::new(&b"Z"[..], Vec::new());
        let err = RepositorySession::new(&store, SyncConfig::new())
            .fulfill(&mut channel)
            .unwrap_err();
        assert!(matches!(err, SyncError::ProtocolViolation(_)));
    }

    #[test]
    fn exchange_moves_objects_both_ways() {
        let mut local = GraphBuilder::new();
        local.commit("base", &[]);
        local.commit("mine", &["base"]);
        let mut remote = GraphBuilder::new();
        remote.commit("base", &[]);
        remote.commit("theirs", &["base"]);

        let local_roots = roots_of(&local.ids(&["mine"]));
        let remote_roots = roots_of(&remote.ids(&["theirs"]));
        let (mut a, mut b) = memory_duplex();
        let responder_store = Arc::clone(remote.store());
        let (ours, theirs) = std::thread::scope(|scope| {
            let peer = scope.spawn(move || {
                RepositorySession::new(responder_store, SyncConfig::new()).exchange(
                    &mut b,
                    &remote_roots,
                    Side::Responder,
                )
            });
            let ours = RepositorySession::new(Arc::clone(local.store()), SyncConfig::new())
                .exchange(&mut a, &local_roots, Side::Initiator);
            (ours, peer.join().unwrap())
        });
        let ours = ours.unwrap();
        let theirs = theirs.unwrap();

        assert_eq!(ours.sent.role, Role::Requester);
        assert_eq!(ours.sent.need, 1);
        assert_eq!(ours.received.need, 1);
        assert_eq!(theirs.sent.need, 1);
        assert!(remote.store().contains(&local.id("mine")));
        assert!(local.store().contains(&remote.id("theirs")));
    }

    #[test]
    fn exchange_continues_after_aligned_failure() {
        let mut local = GraphBuilder::new();
        local.commit("base", &[]);
        let mut remote = GraphBuilder::new();
        remote.commit("base", &[]);
        remote.commit("theirs", &["base"]);

        let ghost = ObjectId::from_bytes([4; 20]);
        let local_roots = roots_of(&[ghost]);
        let remote_roots = roots_of(&remote.ids(&["theirs"]));
        let (mut a, mut b) = memory_duplex();
        let responder_store = Arc::clone(remote.store());
        let (ours, theirs) = std::thread::scope(|scope| {
            let peer = scope.spawn(move || {
                RepositorySession::new(responder_store, SyncConfig::new()).exchange(
                    &mut b,
                    &remote_roots,
                    Side::Responder,
                )
            });
            let ours = RepositorySession::new(Arc::clone(local.store()), SyncConfig::new())
                .exchange(&mut a, &local_roots, Side::Initiator);
            (ours, peer.join().unwrap())
        });

        assert!(matches!(ours, Err(SyncError::Store(_))));
        assert!(matches!(theirs, Err(SyncError::TransferAborted)));
        // The second half still ran.
        assert!(local.store().contains(&remote.id("theirs")));
    }
}
