//! Scratch git repositories for tests that drive the `git` executable.

use revsync_protocol::ObjectId;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Returns true if a usable `git` executable is on the path.
///
/// Tests that need git return early when this is false.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// A bare git repository in a temporary directory.
#[derive(Debug)]
pub struct GitFixture {
    _temp_dir: Option<TempDir>,
    dir: PathBuf,
}

impl GitFixture {
    /// Creates a bare repository in a fresh temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let dir = temp_dir.path().join("repo.git");
        init_bare(&dir);
        Self {
            _temp_dir: Some(temp_dir),
            dir,
        }
    }

    /// Creates a bare repository at `dir`, which is kept after the test.
    pub fn at(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        init_bare(&dir);
        Self {
            _temp_dir: None,
            dir,
        }
    }

    /// Returns the repository directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Writes a commit named `name` with the given parents.
    ///
    /// The commit holds one file `d_<name>` and gets a branch
    /// `refs/heads/<name>`. Identity and dates are fixed, so equal names
    /// and parents give equal ids in any fixture.
    pub fn commit(&self, name: &str, parents: &[ObjectId]) -> ObjectId {
        let blob = self.git_with_input(
            &["hash-object", "-w", "--stdin"],
            format!("content of {name}\n").as_bytes(),
        );
        let tree = self.git_with_input(&["mktree"], format!("100644 blob {blob}\td_{name}\n").as_bytes());

        let parent_hex: Vec<String> = parents.iter().map(ObjectId::to_hex).collect();
        let mut args = vec!["commit-tree", tree.as_str(), "-m", name];
        for parent in &parent_hex {
            args.push("-p");
            args.push(parent);
        }
        let commit = self.git(&args);
        self.git(&["update-ref", &format!("refs/heads/{name}"), &commit]);
        ObjectId::from_hex(&commit).expect("git printed an object id")
    }

    /// Returns true if the repository holds the object.
    pub fn has(&self, id: &ObjectId) -> bool {
        self.command()
            .args(["cat-file", "-e", &id.to_hex()])
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Runs a git command in the repository and returns trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        let output = self.command().args(args).output().expect("failed to run git");
        assert!(
            output.status.success(),
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn git_with_input(&self, args: &[&str], input: &[u8]) -> String {
        let mut child = self
            .command()
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .expect("failed to run git");
        child
            .stdin
            .take()
            .expect("stdin is piped")
            .write_all(input)
            .expect("failed to write git input");
        let output = child.wait_with_output().expect("failed to wait for git");
        assert!(output.status.success(), "git {} failed", args.join(" "));
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.dir)
            .env_remove("GIT_DIR")
            .env("GIT_AUTHOR_NAME", "Test User")
            .env("GIT_AUTHOR_EMAIL", "test@example.com")
            .env("GIT_AUTHOR_DATE", "1700000000 +0000")
            .env("GIT_COMMITTER_NAME", "Test User")
            .env("GIT_COMMITTER_EMAIL", "test@example.com")
            .env("GIT_COMMITTER_DATE", "1700000000 +0000");
        cmd
    }
}

impl Default for GitFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn init_bare(dir: &Path) {
    std::fs::create_dir_all(dir).expect("failed to create repository dir");
    let output = Command::new("git")
        .args(["init", "--bare", "--quiet"])
        .current_dir(dir)
        .env_remove("GIT_DIR")
        .output()
        .expect("failed to init bare repo");
    assert!(output.status.success(), "git init --bare failed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commits_are_reproducible() {
        if !git_available() {
            return;
        }
        let a = GitFixture::new();
        let b = GitFixture::new();
        let base_a = a.commit("base", &[]);
        let base_b = b.commit("base", &[]);
        assert_eq!(base_a, base_b);

        let tip = a.commit("tip", &[base_a]);
        assert!(a.has(&tip));
        assert!(!b.has(&tip));
        assert_eq!(a.git(&["rev-parse", "refs/heads/tip"]), tip.to_hex());
    }
}
