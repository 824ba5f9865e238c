//! Git-backed object store driving the `git` executable.

use crate::backend::ObjectStore;
use crate::error::{StoreError, StoreResult};
use parking_lot::Mutex;
use revsync_protocol::ObjectId;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// Output options for pack creation and unpacking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackOptions {
    /// Show git progress meters on stderr.
    pub progress: bool,
    /// Keep showing progress while writing the pack (local side only).
    pub all_progress: bool,
}

impl PackOptions {
    /// Creates quiet options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether progress is shown.
    #[must_use]
    pub const fn progress(mut self, value: bool) -> Self {
        self.progress = value;
        self
    }

    /// Sets whether progress continues through the write phase.
    #[must_use]
    pub const fn all_progress(mut self, value: bool) -> Self {
        self.all_progress = value;
        self
    }
}

/// A long-running `git cat-file --batch-check`.
struct BatchCheck {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl BatchCheck {
    fn spawn(dir: &Path) -> io::Result<Self> {
        let mut child = git_command(dir)
            .args(["cat-file", "--batch-check"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("cat-file stdout unavailable"))?;
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    fn exists(&mut self, id: &ObjectId) -> io::Result<bool> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::other("cat-file stdin closed"))?;
        // `^{}` keeps git from printing "unable to find" noise for plain hashes.
        writeln!(stdin, "{id}^{{}}")?;
        stdin.flush()?;

        let mut line = String::new();
        if self.stdout.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "cat-file exited",
            ));
        }
        Ok(!line.trim_end().ends_with("missing"))
    }
}

impl Drop for BatchCheck {
    fn drop(&mut self) {
        drop(self.stdin.take());
        let _ = self.child.wait();
    }
}

/// An object store over a git repository directory.
///
/// Existence checks go through one persistent `cat-file --batch-check`
/// process; everything else runs a short-lived git command in the
/// repository directory.
///
/// # Example
///
/// ```no_run
/// use revsync_store::{GitStore, ObjectStore};
///
/// let store = GitStore::open("/srv/git/project.git").unwrap();
/// let tips = store.resolve(&["HEAD".to_string()]).unwrap();
/// ```
pub struct GitStore {
    dir: PathBuf,
    options: PackOptions,
    checker: Mutex<Option<BatchCheck>>,
}

impl std::fmt::Debug for GitStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitStore")
            .field("dir", &self.dir)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl GitStore {
    /// Opens the repository at `dir` (a bare repository or a `.git` directory).
    ///
    /// # Errors
    ///
    /// Returns an error if `dir` is not a directory git recognizes.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(StoreError::NotARepository(dir.display().to_string()));
        }
        let status = git_command(dir)
            .args(["rev-parse", "--git-dir"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if !status.success() {
            return Err(StoreError::NotARepository(dir.display().to_string()));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            options: PackOptions::default(),
            checker: Mutex::new(None),
        })
    }

    /// Sets pack output options.
    #[must_use]
    pub fn with_options(mut self, options: PackOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the repository directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn run(&self, args: &[&str]) -> StoreResult<String> {
        let output = git_command(&self.dir)
            .args(args)
            .stdin(Stdio::null())
            .output()?;
        if !output.status.success() {
            return Err(StoreError::command_failed(
                format!("git {}", args.join(" ")),
                output.status,
            ));
        }
        String::from_utf8(output.stdout)
            .map_err(|_| StoreError::Corrupted("git printed non-UTF-8 output".into()))
    }
}

impl ObjectStore for GitStore {
    fn exists_all(&self, ids: &[ObjectId]) -> StoreResult<Vec<bool>> {
        let mut guard = self.checker.lock();
        if guard.is_none() {
            *guard = Some(BatchCheck::spawn(&self.dir)?);
        }
        let mut answers = Vec::with_capacity(ids.len());
        for id in ids {
            let answer = match guard.as_mut() {
                Some(checker) => checker.exists(id),
                None => Err(io::Error::other("cat-file not running")),
            };
            match answer {
                Ok(present) => answers.push(present),
                Err(e) => {
                    // Restart on next use rather than reuse a desynchronized pipe.
                    *guard = None;
                    return Err(e.into());
                }
            }
        }
        Ok(answers)
    }

    fn immediate_parents(&self, id: &ObjectId) -> StoreResult<Vec<ObjectId>> {
        let output = self.run(&["rev-parse", &format!("{id}^@")])?;
        output
            .split_whitespace()
            .map(|line| ObjectId::from_hex(line).map_err(StoreError::from))
            .collect()
    }

    fn serialize_slice(
        &self,
        include: &[ObjectId],
        exclude: &[ObjectId],
        thin: bool,
        out: &mut dyn Write,
    ) -> StoreResult<()> {
        if include.is_empty() {
            return Ok(());
        }

        let mut args = vec!["pack-objects", "--stdout", "--revs"];
        if thin {
            args.push("--thin");
        }
        if self.options.progress {
            args.push("--progress");
            if self.options.all_progress {
                args.push("--all-progress");
            }
        } else {
            args.push("-q");
        }

        // Without --thin the pack carries the full closure of `include`.
        let mut revs = String::new();
        if thin {
            for id in exclude {
                revs.push_str(&format!("^{id}\n"));
            }
        }
        for id in include {
            revs.push_str(&format!("{id}\n"));
        }

        tracing::debug!(
            include = include.len(),
            exclude = exclude.len(),
            thin,
            "running git pack-objects"
        );
        let mut child = git_command(&self.dir)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;

        // pack-objects reads the whole rev list before it writes anything.
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(revs.as_bytes())?;
        }
        let copied = match child.stdout.take() {
            Some(mut stdout) => io::copy(&mut stdout, out).map(|_| ()),
            None => Err(io::Error::other("pack-objects stdout unavailable")),
        };
        if let Err(e) = copied {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e.into());
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(StoreError::command_failed(
                format!("git {}", args.join(" ")),
                status,
            ));
        }
        Ok(())
    }

    fn materialize_slice(&self, input: &mut dyn Read) -> StoreResult<()> {
        let mut input = BufReader::new(input);
        if input.fill_buf()?.is_empty() {
            return Ok(());
        }

        let mut args = vec!["unpack-objects"];
        if !self.options.progress {
            args.push("-q");
        }
        let mut child = git_command(&self.dir)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()?;

        let copied = match child.stdin.take() {
            Some(mut stdin) => io::copy(&mut input, &mut stdin).map(|_| ()),
            None => Err(io::Error::other("unpack-objects stdin unavailable")),
        };
        let status = child.wait()?;
        if !status.success() {
            return Err(StoreError::command_failed(
                format!("git {}", args.join(" ")),
                status,
            ));
        }
        copied?;
        Ok(())
    }

    fn resolve(&self, revs: &[String]) -> StoreResult<Vec<String>> {
        if revs.is_empty() {
            return Ok(Vec::new());
        }
        let mut args = vec!["rev-parse"];
        args.extend(revs.iter().map(String::as_str));
        let output = self.run(&args)?;
        Ok(output.split_whitespace().map(str::to_string).collect())
    }
}

fn git_command(dir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE");
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_options_builder() {
        let options = PackOptions::new().progress(true).all_progress(true);
        assert!(options.progress);
        assert!(options.all_progress);
        assert_eq!(PackOptions::default(), PackOptions::new());
    }

    #[test]
    fn open_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = GitStore::open(dir.path().join("absent.git")).unwrap_err();
        assert!(matches!(err, StoreError::NotARepository(_)));
    }
}
