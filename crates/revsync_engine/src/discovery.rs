//! Repository discovery under a root directory.

use crate::error::{SyncError, SyncResult};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Lists the directories under `root` whose name ends in `suffix`.
///
/// Paths are relative to `root`, `/`-separated, and sorted. Symlinks are
/// not followed. Discovery keeps descending into matched directories.
///
/// # Errors
///
/// Returns `Discovery` if `root` is not a readable directory.
pub fn discover_repositories(root: &Path, suffix: &str) -> SyncResult<Vec<String>> {
    if !root.is_dir() {
        return Err(SyncError::Discovery(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if !entry.file_name().to_string_lossy().ends_with(suffix) {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            names.push(to_slash_path(relative));
        }
    }
    names.sort();
    tracing::debug!(root = %root.display(), count = names.len(), "discovered repositories");
    Ok(names)
}

/// Joins a `/`-separated relative name onto `root`.
///
/// Absolute names and `..` components are rejected.
pub fn repository_path(root: &Path, name: &str) -> SyncResult<PathBuf> {
    let relative = Path::new(name);
    let safe = !name.is_empty()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe {
        return Err(SyncError::unavailable(name, "not a relative repository path"));
    }
    let mut path = root.to_path_buf();
    for part in name.split('/').filter(|p| !p.is_empty()) {
        path.push(part);
    }
    Ok(path)
}

fn to_slash_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use revsync_testkit::dir_tree;

    #[test]
    fn finds_nested_repositories_sorted() {
        let tmp = dir_tree(&[
            "b.git",
            "a.git/objects",
            "group/c.git",
            "group/plain",
            "deep/er/d.git",
            "notes.gitx",
        ]);
        let names = discover_repositories(tmp.path(), ".git").unwrap();
        assert_eq!(names, vec!["a.git", "b.git", "deep/er/d.git", "group/c.git"]);
    }

    #[test]
    fn descends_into_repositories() {
        let tmp = dir_tree(&["outer.git/modules/inner.git"]);
        let names = discover_repositories(tmp.path(), ".git").unwrap();
        assert_eq!(names, vec!["outer.git", "outer.git/modules/inner.git"]);
    }

    #[test]
    fn files_with_suffix_are_ignored() {
        let tmp = dir_tree(&[]);
        std::fs::write(tmp.path().join("file.git"), b"").unwrap();
        assert!(discover_repositories(tmp.path(), ".git").unwrap().is_empty());
    }

    #[test]
    fn custom_suffix() {
        let tmp = dir_tree(&["x.repo", "y.git"]);
        assert_eq!(discover_repositories(tmp.path(), ".repo").unwrap(), vec!["x.repo"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = dir_tree(&[]);
        let err = discover_repositories(&tmp.path().join("absent"), ".git").unwrap_err();
        assert!(matches!(err, SyncError::Discovery(_)));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let tmp = dir_tree(&["real/a.git"]);
        std::os::unix::fs::symlink(tmp.path().join("real"), tmp.path().join("link")).unwrap();
        let names = discover_repositories(tmp.path(), ".git").unwrap();
        assert_eq!(names, vec!["real/a.git"]);
    }

    #[test]
    fn repository_path_rejects_escapes() {
        let root = Path::new("/srv");
        assert_eq!(repository_path(root, "g/a.git").unwrap(), root.join("g").join("a.git"));
        assert!(repository_path(root, "../etc").is_err());
        assert!(repository_path(root, "/etc").is_err());
        assert!(repository_path(root, "").is_err());
    }
}
