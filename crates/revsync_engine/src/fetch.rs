//! Single-repository, single-direction transfers.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::session::{RepositorySession, TransferStats};
use crate::transport::Channel;
use revsync_protocol::{ControlMessage, Frame, Service};
use revsync_store::ObjectStore;
use std::io::{Read, Write};

/// Pulls `revs`, resolved on the remote side, into `store`.
///
/// # Errors
///
/// `RepositoryUnavailable` if the remote cannot open `remote_root`, and
/// `TransferAborted` if it cannot resolve or serialize the revisions.
pub fn get<S, R, W>(
    channel: &mut Channel<R, W>,
    store: S,
    remote_root: &str,
    revs: &[String],
    config: &SyncConfig,
) -> SyncResult<TransferStats>
where
    S: ObjectStore,
    R: Read,
    W: Write,
{
    open_fetch(channel, remote_root)?;
    channel.write_frame(&Frame::Get)?;
    channel.send(&ControlMessage::Revisions(revs.to_vec()))?;
    RepositorySession::new(store, config.clone()).fulfill(channel)
}

/// Pushes `revs`, resolved through `store`, to the remote repository.
///
/// # Errors
///
/// `RepositoryUnavailable` if the remote cannot open `remote_root`, and
/// `InvalidIdentifier` if a revision does not resolve locally.
pub fn put<S, R, W>(
    channel: &mut Channel<R, W>,
    store: S,
    remote_root: &str,
    revs: &[String],
    config: &SyncConfig,
) -> SyncResult<TransferStats>
where
    S: ObjectStore,
    R: Read,
    W: Write,
{
    open_fetch(channel, remote_root)?;
    channel.write_frame(&Frame::Put)?;
    RepositorySession::new(store, config.clone()).request_revisions(channel, revs)
}

fn open_fetch<R: Read, W: Write>(channel: &mut Channel<R, W>, remote_root: &str) -> SyncResult<()> {
    channel.send(&ControlMessage::Open {
        root: remote_root.to_string(),
        service: Service::Fetch,
    })?;
    match channel.recv()? {
        ControlMessage::Ready => Ok(()),
        ControlMessage::Unavailable { reason } => Err(SyncError::unavailable(remote_root, reason)),
        other => Err(SyncError::unexpected("ready", other.name())),
    }
}
