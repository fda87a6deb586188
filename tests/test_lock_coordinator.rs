// ABOUTME: Integration tests for the lock coordinator against a real store and oracle

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use worklock::git::GitVersionOracle;
use worklock::locks::{LockCoordinator, LockError, LockStore};
use worklock::models::{ConflictKind, SessionId};

fn session(id: &str) -> SessionId {
    SessionId::new(id).unwrap()
}

fn coordinator_in(dir: &TempDir) -> LockCoordinator<GitVersionOracle> {
    let store = LockStore::new(dir.path().join(".worklock/locks"), dir.path().to_path_buf());
    LockCoordinator::new(store, GitVersionOracle::new(dir.path()))
}

fn touch(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn foreign_lock_blocks_acquire_without_leaving_a_record() {
    // BEHAVIOR: if S1 holds an unreleased lock on F, a non-force acquire
    // by S2 fails with Conflict and writes nothing for S2.
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator_in(&dir);
    let file = touch(&dir, "a.md", "content");

    coordinator
        .acquire(&file, &session("SES-20260129-1432-a7f3"), false)
        .unwrap();
    let err = coordinator
        .acquire(&file, &session("SES-20260129-1500-b9e2"), false)
        .unwrap_err();

    let LockError::Conflict(holders) = &err else {
        panic!("expected conflict, got {err:?}");
    };
    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0].session.as_str(), "SES-20260129-1432-a7f3");
    assert_eq!(err.exit_code(), 2);

    let locks = coordinator.store().find_by_file(&file);
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].session.as_str(), "SES-20260129-1432-a7f3");
}

#[test]
fn acquire_then_release_leaves_no_trace() {
    // BEHAVIOR: after release, find_by_file returns nothing for the pair
    // and the emptied session namespace is pruned.
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator_in(&dir);
    let file = touch(&dir, "a.md", "content");
    let owner = session("SES-20260129-1432-a7f3");

    coordinator.acquire(&file, &owner, false).unwrap();
    let outcome = coordinator.release(&file, &owner, true).unwrap();

    assert!(!outcome.conflict_detected);
    assert!(coordinator.store().find_by_file(&file).is_empty());
    assert!(!coordinator.store().session_dir(&owner).exists());
}

#[test]
fn acquired_record_round_trips_through_the_store() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator_in(&dir);
    let file = touch(&dir, "docs/guide.md", "guide text");
    let owner = session("SES-20260129-1432-a7f3");

    let written = coordinator.acquire(&file, &owner, false).unwrap();
    let read = coordinator
        .store()
        .get(&written.file_path, &owner)
        .unwrap()
        .unwrap();
    assert_eq!(read, written);
    assert_eq!(read.file, "guide.md");
    assert_eq!(read.relative_path, PathBuf::from("docs/guide.md"));
}

#[test]
fn release_after_content_change_reports_both_tokens_and_still_releases() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator_in(&dir);
    let file = touch(&dir, "a.md", "original");
    let owner = session("SES-20260129-1432-a7f3");

    let record = coordinator.acquire(&file, &owner, false).unwrap();
    fs::write(&file, "changed behind the lock").unwrap();

    let outcome = coordinator.release(&file, &owner, true).unwrap();
    assert!(outcome.conflict_detected);
    assert_eq!(outcome.original_hash, record.hash);
    let current = outcome.current_hash.expect("current token must be surfaced");
    assert_ne!(current, record.hash);
    assert!(outcome.warning.is_some());
    // Verification is advisory: the record is gone regardless.
    assert!(coordinator.store().find_by_file(&file).is_empty());
}

#[test]
fn scan_reports_exactly_one_file_deleted_conflict() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator_in(&dir);
    let file = touch(&dir, "doomed.md", "content");
    let owner = session("SES-20260129-1432-a7f3");

    coordinator.acquire(&file, &owner, false).unwrap();
    fs::remove_file(&file).unwrap();

    let conflicts = coordinator.scan_conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].kind, ConflictKind::FileDeleted);
    assert_eq!(conflicts[0].record.file, "doomed.md");
    assert!(conflicts[0].current_hash.is_none());

    // Read-only audit: the record itself survives the scan.
    assert_eq!(coordinator.store().list_all(Some(&owner)).len(), 1);
}

#[test]
fn scan_is_quiet_when_nothing_diverged() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator_in(&dir);
    let file = touch(&dir, "a.md", "content");

    coordinator
        .acquire(&file, &session("SES-20260129-1432-a7f3"), false)
        .unwrap();
    assert!(coordinator.scan_conflicts().is_empty());
}

#[test]
fn force_acquire_steals_and_reassigns_the_lock() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator_in(&dir);
    let file = touch(&dir, "a.md", "content");

    coordinator
        .acquire(&file, &session("SES-20260129-1432-a7f3"), false)
        .unwrap();
    let record = coordinator
        .acquire(&file, &session("SES-20260129-1500-b9e2"), true)
        .unwrap();

    let locks = coordinator.store().find_by_file(&file);
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].session, record.session);
    // The stolen namespace emptied out and is gone.
    assert!(!coordinator
        .store()
        .session_dir(&session("SES-20260129-1432-a7f3"))
        .exists());
}

#[test]
fn cleanup_releases_clean_locks_and_keeps_diverged_ones() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator_in(&dir);
    let clean = touch(&dir, "clean.md", "stable");
    let diverged = touch(&dir, "diverged.md", "before");
    let owner = session("SES-20260129-1432-a7f3");

    coordinator.acquire(&clean, &owner, false).unwrap();
    coordinator.acquire(&diverged, &owner, false).unwrap();
    fs::write(&diverged, "after").unwrap();

    let report = coordinator.cleanup(&owner, false).unwrap();
    assert_eq!(report.released, vec!["clean.md".to_string()]);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].file, PathBuf::from("diverged.md"));
    assert!(report.errors.is_empty());
    assert!(!report.is_clean());
    assert_eq!(coordinator.store().list_all(Some(&owner)).len(), 1);

    // Forced cleanup clears the rest and prunes the namespace.
    let forced = coordinator.cleanup(&owner, true).unwrap();
    assert!(forced.is_clean());
    assert!(!coordinator.store().session_dir(&owner).exists());
}

#[test]
fn cleanup_of_an_empty_namespace_is_a_clean_no_op() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator_in(&dir);

    let report = coordinator
        .cleanup(&session("SES-20260129-1432-a7f3"), false)
        .unwrap();
    assert!(report.is_clean());
    assert!(report.released.is_empty());
}

#[test]
fn sessions_lock_distinct_files_independently() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator_in(&dir);
    let first = touch(&dir, "a.md", "one");
    let second = touch(&dir, "b.md", "two");

    coordinator
        .acquire(&first, &session("SES-20260129-1432-a7f3"), false)
        .unwrap();
    coordinator
        .acquire(&second, &session("SES-20260129-1500-b9e2"), false)
        .unwrap();

    assert_eq!(coordinator.store().list_all(None).len(), 2);
    assert_eq!(coordinator.store().find_by_file(&first).len(), 1);
    assert_eq!(coordinator.store().find_by_file(&second).len(), 1);
}
