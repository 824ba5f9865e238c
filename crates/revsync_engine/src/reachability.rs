//! Root discovery from a repository's reference files.
//!
//! Every identifier named by a ref, a reflog entry, or a top-level state
//! file (`HEAD`, `packed-refs`, `FETCH_HEAD`, ...) is a root. Implicit state
//! such as an in-progress rebase is not resolved.

use crate::error::{SyncError, SyncResult};
use revsync_protocol::{ObjectId, RootSet};
use revsync_store::ObjectStore;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Scans one repository directory for referenced identifiers.
#[derive(Debug, Clone)]
pub struct ReachabilityScanner {
    dir: PathBuf,
}

impl ReachabilityScanner {
    /// Creates a scanner for the repository at `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Collects every identifier named in the reference files.
    ///
    /// # Errors
    ///
    /// Returns `Discovery` if the directory or one of its files cannot be
    /// read.
    pub fn scan(&self) -> SyncResult<BTreeSet<ObjectId>> {
        if !self.dir.is_dir() {
            return Err(SyncError::Discovery(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }

        let mut ids = BTreeSet::new();
        for file in walk_files(&self.dir.join("refs"))? {
            collect_file(&file, 1, &mut ids)?;
        }
        for file in walk_files(&self.dir.join("logs"))? {
            collect_file(&file, 2, &mut ids)?;
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| read_error(&self.dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| read_error(&self.dir, e))?;
            let is_file = entry
                .file_type()
                .map_err(|e| read_error(&entry.path(), e))?
                .is_file();
            if is_file {
                // Top-level files include config and description; their
                // other lines are expected.
                collect(&read_lossy(&entry.path())?, 1, &mut ids);
            }
        }

        ids.remove(&ObjectId::ZERO);
        tracing::debug!(dir = %self.dir.display(), ids = ids.len(), "scanned references");
        Ok(ids)
    }

    /// Returns the scanned identifiers the store actually holds.
    ///
    /// # Errors
    ///
    /// Returns `Discovery` on read failures and `Store` if the store cannot
    /// be queried.
    pub fn reachable<S: ObjectStore + ?Sized>(&self, store: &S) -> SyncResult<RootSet> {
        let candidates: Vec<ObjectId> = self.scan()?.into_iter().collect();
        let present = store.exists_all(&candidates)?;
        Ok(candidates
            .into_iter()
            .zip(present)
            .filter_map(|(id, present)| present.then_some(id))
            .collect())
    }
}

/// Regular files below `dir`, in walk order. A missing `dir` yields none.
fn walk_files(dir: &Path) -> SyncResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| SyncError::Discovery(e.to_string()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn read_lossy(path: &Path) -> SyncResult<String> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    if let Cow::Owned(_) = text {
        tracing::debug!(file = %path.display(), "replaced invalid UTF-8");
    }
    Ok(text.into_owned())
}

/// Collects from a ref or reflog file, where every line should name an
/// object. Lines that do not are logged and skipped.
fn collect_file(path: &Path, columns: usize, ids: &mut BTreeSet<ObjectId>) -> SyncResult<()> {
    for line in collect(&read_lossy(path)?, columns, ids) {
        tracing::debug!(file = %path.display(), line, "skipping line without an identifier");
    }
    Ok(())
}

fn read_error(path: &Path, err: std::io::Error) -> SyncError {
    SyncError::Discovery(format!("cannot read {}: {err}", path.display()))
}

/// Adds the identifiers in the first `columns` whitespace-separated fields
/// of each line. A leading `^` marks a peeled id.
///
/// Returns the 1-based numbers of lines that named no identifier. Blank
/// lines, `#` comments and symbolic `ref:` lines are not counted.
fn collect(text: &str, columns: usize, ids: &mut BTreeSet<ObjectId>) -> Vec<usize> {
    let mut skipped = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let mut found = false;
        for field in line.split_whitespace().take(columns) {
            let field = field.strip_prefix('^').unwrap_or(field);
            if let Ok(id) = ObjectId::from_hex(&field.to_ascii_lowercase()) {
                ids.insert(id);
                found = true;
            }
        }
        let trimmed = line.trim_start();
        let expected = !(trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("ref:"));
        if !found && expected {
            skipped.push(index + 1);
        }
    }
    skipped
}
