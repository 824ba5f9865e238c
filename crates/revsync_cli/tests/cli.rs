//! End-to-end tests of the `revsync` binary.
//!
//! The remote command is the binary itself running `serve`, so every test
//! exercises the real pipe handling. Tests that need repositories return
//! early when `git` is not installed.

use revsync_testkit::{git_available, GitFixture};
use std::path::Path;
use std::process::{Command, Output};

const BIN: &str = env!("CARGO_BIN_EXE_revsync");

fn revsync(args: &[&str]) -> Output {
    Command::new(BIN).args(args).output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn discover_lists_repositories() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("a.git")).unwrap();
    std::fs::create_dir_all(root.path().join("group/b.git")).unwrap();
    std::fs::create_dir_all(root.path().join("plain")).unwrap();

    let output = revsync(&["discover", root.path().to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "a.git\ngroup/b.git\n");

    let output = revsync(&["discover", "--format", "json", root.path().to_str().unwrap()]);
    let names: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(names, vec!["a.git", "group/b.git"]);
}

#[test]
fn discover_missing_root_fails() {
    let root = tempfile::tempdir().unwrap();
    let missing = root.path().join("nope");
    let output = revsync(&["discover", missing.to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn scan_prints_branch_tips() {
    if !git_available() {
        return;
    }
    let repo = GitFixture::new();
    let base = repo.commit("base", &[]);
    let tip = repo.commit("tip", &[base]);

    let output = revsync(&["scan", repo.path().to_str().unwrap()]);
    assert!(output.status.success());
    let mut expected = vec![base.to_hex(), tip.to_hex()];
    expected.sort();
    let printed: Vec<String> = stdout(&output).lines().map(String::from).collect();
    assert_eq!(printed, expected);
}

#[test]
fn get_pulls_from_serving_binary() {
    if !git_available() {
        return;
    }
    let source = GitFixture::new();
    let base = source.commit("base", &[]);
    let tip = source.commit("tip", &[base]);
    let target = GitFixture::new();
    target.commit("base", &[]);

    let output = revsync(&[
        "get",
        "--repo",
        target.path().to_str().unwrap(),
        source.path().to_str().unwrap(),
        "refs/heads/tip",
        "--",
        BIN,
        "serve",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(target.has(&tip));
}

#[test]
fn put_pushes_to_serving_binary() {
    if !git_available() {
        return;
    }
    let source = GitFixture::new();
    let base = source.commit("base", &[]);
    let tip = source.commit("tip", &[base]);
    let target = GitFixture::new();

    let output = revsync(&[
        "put",
        "--full",
        "--repo",
        source.path().to_str().unwrap(),
        target.path().to_str().unwrap(),
        "refs/heads/tip",
        "--",
        BIN,
        "serve",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(target.has(&base));
    assert!(target.has(&tip));
}

fn bare_under(root: &Path, name: &str) -> GitFixture {
    GitFixture::at(root.join(name))
}

#[test]
fn sync_exchanges_both_ways() {
    if !git_available() {
        return;
    }
    let local = tempfile::tempdir().unwrap();
    let remote = tempfile::tempdir().unwrap();

    let ours = bare_under(local.path(), "a.git");
    let theirs = bare_under(remote.path(), "a.git");
    let shared = ours.commit("shared", &[]);
    assert_eq!(theirs.commit("shared", &[]), shared);
    let mine = ours.commit("mine", &[shared]);
    let yours = theirs.commit("yours", &[shared]);
    bare_under(local.path(), "only-here.git");

    let output = revsync(&[
        "sync",
        "--format",
        "json",
        local.path().to_str().unwrap(),
        remote.path().to_str().unwrap(),
        "--",
        BIN,
        "serve",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["synced"][0], "a.git");
    assert_eq!(summary["local_only"][0], "only-here.git");
    assert!(ours.has(&yours));
    assert!(theirs.has(&mine));
}

#[test]
fn unusable_remote_command_fails() {
    let repo = tempfile::tempdir().unwrap();
    let output = revsync(&[
        "sync",
        repo.path().to_str().unwrap(),
        "/nowhere",
        "--",
        "revsync-test-no-such-program",
    ]);
    assert!(!output.status.success());
}
