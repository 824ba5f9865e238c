//! Tests for `GitStore` against real repositories.
//!
//! Every test returns early when `git` is not installed.

use revsync_protocol::ObjectId;
use revsync_store::{GitStore, ObjectStore, StoreError};
use revsync_testkit::{git_available, GitFixture};

fn open(fixture: &GitFixture) -> GitStore {
    GitStore::open(fixture.path()).unwrap()
}

#[test]
fn existence_and_parents() {
    if !git_available() {
        return;
    }
    let fixture = GitFixture::new();
    let base = fixture.commit("base", &[]);
    let left = fixture.commit("left", &[base]);
    let right = fixture.commit("right", &[base]);
    let merge = fixture.commit("merge", &[left, right]);

    let store = open(&fixture);
    let absent = ObjectId::from_bytes([0x5a; 20]);
    assert_eq!(
        store.exists_all(&[base, absent, merge]).unwrap(),
        vec![true, false, true]
    );
    // The batch process is reused across calls.
    assert_eq!(store.exists_all(&[right]).unwrap(), vec![true]);

    assert_eq!(store.immediate_parents(&merge).unwrap(), vec![left, right]);
    assert!(store.immediate_parents(&base).unwrap().is_empty());
}

#[test]
fn resolve_names() {
    if !git_available() {
        return;
    }
    let fixture = GitFixture::new();
    let tip = fixture.commit("tip", &[]);
    let store = open(&fixture);

    let resolved = store.resolve(&["refs/heads/tip".to_string()]).unwrap();
    assert_eq!(resolved, vec![tip.to_hex()]);
    assert!(store.resolve(&[]).unwrap().is_empty());
    assert!(matches!(
        store.resolve(&["refs/heads/missing".to_string()]),
        Err(StoreError::CommandFailed { .. })
    ));
}

#[test]
fn thin_pack_round_trip() {
    if !git_available() {
        return;
    }
    let source = GitFixture::new();
    let base = source.commit("base", &[]);
    let mid = source.commit("mid", &[base]);
    let tip = source.commit("tip", &[mid]);

    let target = GitFixture::new();
    assert_eq!(target.commit("base", &[]), base);

    let mut pack = Vec::new();
    open(&source)
        .serialize_slice(&[tip], &[base], true, &mut pack)
        .unwrap();
    assert!(!pack.is_empty());

    let store = open(&target);
    store.materialize_slice(&mut pack.as_slice()).unwrap();
    assert_eq!(store.exists_all(&[tip, mid]).unwrap(), vec![true, true]);
}

#[test]
fn full_pack_into_empty_repository() {
    if !git_available() {
        return;
    }
    let source = GitFixture::new();
    let base = source.commit("base", &[]);
    let tip = source.commit("tip", &[base]);
    let target = GitFixture::new();

    let mut pack = Vec::new();
    open(&source)
        .serialize_slice(&[tip], &[base], false, &mut pack)
        .unwrap();
    let store = open(&target);
    store.materialize_slice(&mut pack.as_slice()).unwrap();
    assert!(target.has(&base));
    assert!(target.has(&tip));
}

#[test]
fn empty_slices() {
    if !git_available() {
        return;
    }
    let fixture = GitFixture::new();
    let store = open(&fixture);
    let mut out = Vec::new();
    store.serialize_slice(&[], &[], true, &mut out).unwrap();
    assert!(out.is_empty());
    store.materialize_slice(&mut &b""[..]).unwrap();
}

#[test]
fn garbage_payload_fails() {
    if !git_available() {
        return;
    }
    let fixture = GitFixture::new();
    let store = open(&fixture);
    let err = store
        .materialize_slice(&mut &b"definitely not a pack"[..])
        .unwrap_err();
    assert!(matches!(err, StoreError::CommandFailed { .. }));
}

#[test]
fn open_rejects_plain_directory() {
    if !git_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        GitStore::open(dir.path()),
        Err(StoreError::NotARepository(_))
    ));
}
