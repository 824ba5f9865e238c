//! `sync`: every repository under two roots, both directions.

use super::remote::RemoteProcess;
use super::{CliError, Options};
use revsync_engine::{SyncOrchestrator, SyncReport, TracingObserver};
use serde::Serialize;
use std::path::Path;

/// Summary printed after a sync.
#[derive(Debug, Serialize)]
pub struct SyncSummary {
    /// Local root.
    pub local_root: String,
    /// Remote root.
    pub remote_root: String,
    /// Repositories exchanged in both directions.
    pub synced: Vec<String>,
    /// Repositories that failed, with the reason.
    pub failed: Vec<FailedRepository>,
    /// Repositories not attempted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    /// Repositories only present locally.
    pub local_only: Vec<String>,
    /// Repositories only present remotely.
    pub remote_only: Vec<String>,
}

/// A repository that failed to sync.
#[derive(Debug, Serialize)]
pub struct FailedRepository {
    /// Relative repository name.
    pub name: String,
    /// Error description.
    pub error: String,
}

impl SyncSummary {
    fn new(local_root: &Path, remote_root: &str, report: SyncReport) -> Self {
        Self {
            local_root: local_root.display().to_string(),
            remote_root: remote_root.to_string(),
            synced: report.synced,
            failed: report
                .failed
                .into_iter()
                .map(|(name, error)| FailedRepository { name, error })
                .collect(),
            skipped: report.skipped,
            local_only: report.local_only,
            remote_only: report.remote_only,
        }
    }

    fn unfinished(&self) -> usize {
        self.failed.len() + self.skipped.len()
    }
}

/// Runs the sync command.
pub fn run(
    options: &Options,
    local_root: &Path,
    remote_root: &str,
    command: &[String],
    format: &str,
) -> Result<(), CliError> {
    let mut orchestrator =
        SyncOrchestrator::new(options.sync_config(), options.opener(), TracingObserver);
    let mut remote = RemoteProcess::spawn(command)?;
    let report = match orchestrator.run(remote.channel(), local_root, remote_root) {
        Ok(report) => report,
        Err(e) => {
            if let Err(exit) = remote.finish() {
                tracing::debug!(error = %exit, "remote command failed");
            }
            return Err(e.into());
        }
    };

    let summary = SyncSummary::new(local_root, remote_root, report);
    // A skipped pair means the channel broke; the exit status adds nothing.
    if summary.skipped.is_empty() {
        remote.finish()?;
    } else if let Err(exit) = remote.finish() {
        tracing::debug!(error = %exit, "remote command failed");
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => print_text_output(&summary),
    }

    match summary.unfinished() {
        0 => Ok(()),
        n => Err(CliError::Incomplete(n)),
    }
}

fn print_text_output(summary: &SyncSummary) {
    println!("Sync {} <-> {}", summary.local_root, summary.remote_root);
    println!();
    for name in &summary.synced {
        println!("  synced   {name}");
    }
    for failed in &summary.failed {
        println!("  failed   {}: {}", failed.name, failed.error);
    }
    for name in &summary.skipped {
        println!("  skipped  {name}");
    }
    for name in &summary.local_only {
        println!("  local    {name} (no remote counterpart)");
    }
    for name in &summary.remote_only {
        println!("  remote   {name} (no local counterpart)");
    }
    println!();
    println!(
        "{} synced, {} failed, {} skipped",
        summary.synced.len(),
        summary.failed.len(),
        summary.skipped.len()
    );
}
