//! The remote end of a channel.
//!
//! `serve` answers exactly one `Open` and then plays whatever part the
//! initiator asks for: one fetch direction, or the responder side of every
//! repository pair under a root.

use crate::config::SyncConfig;
use crate::discovery::{discover_repositories, repository_path};
use crate::error::{SyncError, SyncResult};
use crate::reachability::ReachabilityScanner;
use crate::session::{RepositorySession, Side};
use crate::transport::Channel;
use revsync_protocol::{ControlMessage, Frame, RootSet, Service};
use revsync_store::{ObjectStore, StoreResult};
use std::io::{Read, Write};
use std::path::Path;

/// Serves one session on `channel`, opening stores with `opener`.
///
/// # Errors
///
/// Returns the first error that ends the session. Failures of a single
/// repository during a sync are logged and do not end it unless they leave
/// the channel misaligned.
pub fn serve<S, F, R, W>(channel: &mut Channel<R, W>, config: &SyncConfig, mut opener: F) -> SyncResult<()>
where
    S: ObjectStore,
    F: FnMut(&Path) -> StoreResult<S>,
    R: Read,
    W: Write,
{
    let (root, service) = match channel.recv()? {
        ControlMessage::Open { root, service } => (root, service),
        other => {
            return Err(SyncError::unexpected("open", other.name()));
        }
    };
    tracing::info!(%root, ?service, "session opened");

    match service {
        Service::Fetch => serve_fetch(channel, config, &mut opener, &root),
        Service::Sync => serve_sync(channel, config, &mut opener, &root),
    }
}

fn serve_fetch<S, F, R, W>(
    channel: &mut Channel<R, W>,
    config: &SyncConfig,
    opener: &mut F,
    root: &str,
) -> SyncResult<()>
where
    S: ObjectStore,
    F: FnMut(&Path) -> StoreResult<S>,
    R: Read,
    W: Write,
{
    let store = match opener(Path::new(root)) {
        Ok(store) => store,
        Err(e) => {
            let reason = e.to_string();
            channel.send(&ControlMessage::Unavailable {
                reason: reason.clone(),
            })?;
            return Err(SyncError::unavailable(root, reason));
        }
    };
    channel.send(&ControlMessage::Ready)?;

    let session = RepositorySession::new(store, config.clone());
    match channel.read_frame()? {
        Frame::Get => {
            let revs = match channel.recv()? {
                ControlMessage::Revisions(revs) => revs,
                other => {
                    return Err(SyncError::unexpected("revisions", other.name()));
                }
            };
            let stats = session.request_revisions(channel, &revs)?;
            tracing::info!(need = stats.need, bytes = stats.payload_bytes, "get served");
        }
        Frame::Put => {
            let stats = session.fulfill(channel)?;
            tracing::info!(need = stats.need, bytes = stats.payload_bytes, "put served");
        }
        other => {
            return Err(SyncError::unexpected("get or put", other.name()));
        }
    }
    Ok(())
}

fn serve_sync<S, F, R, W>(
    channel: &mut Channel<R, W>,
    config: &SyncConfig,
    opener: &mut F,
    root: &str,
) -> SyncResult<()>
where
    S: ObjectStore,
    F: FnMut(&Path) -> StoreResult<S>,
    R: Read,
    W: Write,
{
    let root_path = Path::new(root);
    let names = match discover_repositories(root_path, &config.repository_suffix) {
        Ok(names) => names,
        Err(e) => {
            channel.send(&ControlMessage::Unavailable {
                reason: e.to_string(),
            })?;
            return Err(e);
        }
    };
    channel.send(&ControlMessage::Repositories(names.clone()))?;

    loop {
        let name = match channel.recv()? {
            ControlMessage::Done => return Ok(()),
            ControlMessage::Select(name) => name,
            other => {
                return Err(SyncError::unexpected("select or done", other.name()));
            }
        };

        if names.binary_search(&name).is_err() {
            tracing::warn!(repository = %name, "refusing unknown repository");
            channel.send(&ControlMessage::Unavailable {
                reason: format!("{name} is not a repository under {root}"),
            })?;
            continue;
        }

        let (store, roots) = match prepare(root_path, &name, opener) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::warn!(repository = %name, error = %e, "cannot serve repository");
                channel.send(&ControlMessage::Unavailable {
                    reason: e.to_string(),
                })?;
                continue;
            }
        };
        channel.send(&ControlMessage::Ready)?;

        let session = RepositorySession::new(store, config.clone());
        match session.exchange(channel, &roots, Side::Responder) {
            Ok(stats) => {
                tracing::info!(
                    repository = %name,
                    sent = stats.sent.need,
                    received = stats.received.need,
                    "synced"
                );
            }
            Err(e) if e.misaligns_channel() => return Err(e),
            Err(e) => tracing::warn!(repository = %name, error = %e, "sync failed"),
        }
    }
}

fn prepare<S, F>(root: &Path, name: &str, opener: &mut F) -> SyncResult<(S, RootSet)>
where
    S: ObjectStore,
    F: FnMut(&Path) -> StoreResult<S>,
{
    let path = repository_path(root, name)?;
    let store = opener(&path)?;
    let roots = ReachabilityScanner::new(&path).reachable(&store)?;
    Ok((store, roots))
}
