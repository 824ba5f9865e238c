//! CLI command implementations.

pub mod discover;
pub mod fetch;
pub mod remote;
pub mod scan;
pub mod serve;
pub mod sync;

use revsync_engine::{SyncConfig, SyncError};
use revsync_store::{GitStore, PackOptions, StoreError, StoreResult};
use std::path::Path;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// A transfer or discovery failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// A local repository could not be used.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The remote command could not be started.
    #[error("cannot start `{command}`: {source}")]
    Spawn {
        /// The program that failed to start.
        command: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The remote command exited unsuccessfully.
    #[error("remote command exited with {0}")]
    RemoteExit(ExitStatus),

    /// Some repositories did not sync.
    #[error("{0} repositories did not sync")]
    Incomplete(usize),

    /// JSON output failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Writing output failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Flags shared by every command.
#[derive(Debug, Clone)]
pub struct Options {
    /// Disable thin transfers.
    pub full: bool,
    /// Let the object store report progress.
    pub progress: bool,
    /// Directory suffix that marks a repository.
    pub suffix: String,
}

impl Options {
    /// Builds the engine configuration.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::new()
            .with_thin(!self.full)
            .with_repository_suffix(self.suffix.clone())
    }

    /// Builds the pack options for git stores.
    pub fn pack_options(&self) -> PackOptions {
        PackOptions::new()
            .progress(self.progress)
            .all_progress(self.progress)
    }

    /// Returns a function that opens git stores with these options.
    pub fn opener(&self) -> impl FnMut(&Path) -> StoreResult<GitStore> {
        let options = self.pack_options();
        move |path: &Path| Ok(GitStore::open(path)?.with_options(options))
    }
}
