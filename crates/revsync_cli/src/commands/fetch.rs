//! `get` and `put`: one repository, one direction.

use super::remote::RemoteProcess;
use super::{CliError, Options};
use revsync_engine::{SyncResult, TransferStats};
use revsync_store::GitStore;
use std::path::Path;

/// Pulls `revs` of `remote_dir` into the repository at `repo`.
pub fn get(
    options: &Options,
    repo: &Path,
    remote_dir: &str,
    revs: &[String],
    command: &[String],
) -> Result<(), CliError> {
    let store = GitStore::open(repo)?.with_options(options.pack_options());
    let config = options.sync_config();
    let mut remote = RemoteProcess::spawn(command)?;
    let result = revsync_engine::get(remote.channel(), &store, remote_dir, revs, &config);
    conclude(remote, result, "get")
}

/// Pushes `revs` of the repository at `repo` into `remote_dir`.
pub fn put(
    options: &Options,
    repo: &Path,
    remote_dir: &str,
    revs: &[String],
    command: &[String],
) -> Result<(), CliError> {
    let store = GitStore::open(repo)?.with_options(options.pack_options());
    let config = options.sync_config();
    let mut remote = RemoteProcess::spawn(command)?;
    let result = revsync_engine::put(remote.channel(), &store, remote_dir, revs, &config);
    conclude(remote, result, "put")
}

// A transfer error outranks the exit status it usually causes.
fn conclude(
    remote: RemoteProcess,
    result: SyncResult<TransferStats>,
    operation: &str,
) -> Result<(), CliError> {
    match result {
        Ok(stats) => {
            remote.finish()?;
            tracing::info!(
                operation,
                queries = stats.queries,
                missing = stats.need,
                bytes = stats.payload_bytes,
                "transfer complete"
            );
            Ok(())
        }
        Err(e) => {
            if let Err(exit) = remote.finish() {
                tracing::debug!(error = %exit, "remote command failed");
            }
            Err(e.into())
        }
    }
}
