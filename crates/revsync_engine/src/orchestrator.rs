//! Bidirectional sync of every repository under two roots.

use crate::config::SyncConfig;
use crate::discovery::{discover_repositories, repository_path};
use crate::error::{SyncError, SyncResult};
use crate::observer::{SyncEvent, SyncObserver};
use crate::reachability::ReachabilityScanner;
use crate::session::{ExchangeStats, RepositorySession, Side};
use crate::transport::Channel;
use revsync_protocol::{ControlMessage, Service};
use revsync_store::{ObjectStore, StoreResult};
use std::collections::BTreeSet;
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::path::Path;

/// Outcome of a multi-repository sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Pairs exchanged in both directions.
    pub synced: Vec<String>,
    /// Pairs that failed, with the error description.
    pub failed: Vec<(String, String)>,
    /// Pairs not attempted after the channel became unusable.
    pub skipped: Vec<String>,
    /// Repositories present only locally.
    pub local_only: Vec<String>,
    /// Repositories present only remotely.
    pub remote_only: Vec<String>,
}

impl SyncReport {
    /// Returns true if every pair synced and both sides had the same set.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
            && self.skipped.is_empty()
            && self.local_only.is_empty()
            && self.remote_only.is_empty()
    }
}

/// Drives the initiator side of a sync over one channel.
///
/// Repository pairs are processed one at a time in name order. A failed
/// pair is reported and the next one runs, unless the failure left the
/// channel misaligned; then the rest are skipped.
///
/// # Example
///
/// ```no_run
/// use revsync_engine::{SyncConfig, SyncOrchestrator, TracingObserver};
/// use revsync_store::GitStore;
/// use std::path::Path;
///
/// # fn demo(channel: &mut revsync_engine::MemoryChannel) -> revsync_engine::SyncResult<()> {
/// let mut orchestrator =
///     SyncOrchestrator::new(SyncConfig::new(), |path: &Path| GitStore::open(path), TracingObserver);
/// let report = orchestrator.run(channel, Path::new("/srv/git"), "/backup/git")?;
/// println!("{} synced", report.synced.len());
/// # Ok(())
/// # }
/// ```
pub struct SyncOrchestrator<S, F, O> {
    config: SyncConfig,
    opener: F,
    observer: O,
    _store: PhantomData<fn() -> S>,
}

impl<S, F, O> SyncOrchestrator<S, F, O>
where
    S: ObjectStore,
    F: FnMut(&Path) -> StoreResult<S>,
    O: SyncObserver,
{
    /// Creates an orchestrator that opens local stores with `opener`.
    pub fn new(config: SyncConfig, opener: F, observer: O) -> Self {
        Self {
            config,
            opener,
            observer,
            _store: PhantomData,
        }
    }

    /// Syncs every repository under `local_root` with its namesake under
    /// `remote_root` on the other end of `channel`.
    ///
    /// # Errors
    ///
    /// Fails only if the local root cannot be listed or the remote side
    /// refuses or breaks the opening dialogue. Per-pair failures are in
    /// the report.
    pub fn run<R: Read, W: Write>(
        &mut self,
        channel: &mut Channel<R, W>,
        local_root: &Path,
        remote_root: &str,
    ) -> SyncResult<SyncReport> {
        let local = discover_repositories(local_root, &self.config.repository_suffix)?;

        channel.send(&ControlMessage::Open {
            root: remote_root.to_string(),
            service: Service::Sync,
        })?;
        let remote = match channel.recv()? {
            ControlMessage::Repositories(names) => names,
            ControlMessage::Unavailable { reason } => {
                return Err(SyncError::unavailable(remote_root, reason));
            }
            other => {
                return Err(SyncError::unexpected("repository list", other.name()));
            }
        };

        let local: BTreeSet<String> = local.into_iter().collect();
        let remote: BTreeSet<String> = remote.into_iter().collect();
        let mut report = SyncReport::default();

        for name in local.difference(&remote) {
            self.observer.on_event(&SyncEvent::LocalOnly { name: name.clone() });
            report.local_only.push(name.clone());
        }
        for name in remote.difference(&local) {
            self.observer.on_event(&SyncEvent::RemoteOnly { name: name.clone() });
            report.remote_only.push(name.clone());
        }

        let mut aligned = true;
        for name in local.intersection(&remote) {
            if !aligned {
                self.observer.on_event(&SyncEvent::PairSkipped { name: name.clone() });
                report.skipped.push(name.clone());
                continue;
            }

            self.observer.on_event(&SyncEvent::PairStarted { name: name.clone() });
            match self.sync_pair(channel, local_root, name) {
                Ok(stats) => {
                    self.observer.on_event(&SyncEvent::PairFinished {
                        name: name.clone(),
                        stats,
                    });
                    report.synced.push(name.clone());
                }
                Err(e) => {
                    aligned = !e.misaligns_channel();
                    self.observer.on_event(&SyncEvent::PairFailed {
                        name: name.clone(),
                        error: e.to_string(),
                    });
                    report.failed.push((name.clone(), e.to_string()));
                }
            }
        }

        if aligned {
            channel.send(&ControlMessage::Done)?;
        }
        Ok(report)
    }

    fn sync_pair<R: Read, W: Write>(
        &mut self,
        channel: &mut Channel<R, W>,
        local_root: &Path,
        name: &str,
    ) -> SyncResult<ExchangeStats> {
        // Nothing is sent until the local side is ready, so these failures
        // leave the channel untouched.
        let path = repository_path(local_root, name)?;
        let store = (self.opener)(&path)?;
        let roots = ReachabilityScanner::new(&path).reachable(&store)?;

        channel.send(&ControlMessage::Select(name.to_string()))?;
        match channel.recv()? {
            ControlMessage::Ready => {}
            ControlMessage::Unavailable { reason } => {
                return Err(SyncError::unavailable(name, reason));
            }
            other => {
                return Err(SyncError::unexpected("ready", other.name()));
            }
        }

        RepositorySession::new(store, self.config.clone()).exchange(channel, &roots, Side::Initiator)
    }
}
