//! `scan`: the roots a repository's reference files point at.

use super::CliError;
use revsync_engine::ReachabilityScanner;
use revsync_store::GitStore;
use std::path::Path;

/// Prints the reachable roots of the repository at `repo`.
pub fn run(repo: &Path, format: &str) -> Result<(), CliError> {
    let store = GitStore::open(repo)?;
    let roots = ReachabilityScanner::new(repo).reachable(&store)?;
    let ids: Vec<String> = roots.iter().map(|id| id.to_hex()).collect();
    tracing::debug!(count = ids.len(), "scan complete");

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&ids)?),
        _ => {
            for id in &ids {
                println!("{id}");
            }
        }
    }
    Ok(())
}
