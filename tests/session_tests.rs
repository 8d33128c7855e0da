//! Integration tests for sessions: expiry, locking rules and entry access.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use passvault::crypto::{Argon2Params, KdfProfile};
use passvault::errors::VaultError;
use passvault::vault::{self, sort_by_title, Entry, ManualClock, SessionManager, SessionState};
use tempfile::TempDir;

const PASSWORD: &[u8] = b"Correct-Horse-1";
const TIMEOUT: Duration = Duration::from_secs(15 * 60);
const EPSILON: Duration = Duration::from_secs(1);

/// A fresh vault on disk with the cheapest KDF settings.
fn new_vault() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("vault.json");
    let cheap = Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    };
    let profile = KdfProfile {
        encryption: cheap,
        verification: cheap,
    };
    vault::create(&path, PASSWORD, &profile).expect("create vault");
    (dir, path)
}

fn manual_manager() -> (Arc<ManualClock>, SessionManager) {
    let clock = Arc::new(ManualClock::new());
    let manager = SessionManager::with_clock(TIMEOUT, clock.clone());
    (clock, manager)
}

fn titles(manager: &SessionManager) -> Vec<String> {
    let session = manager.current().expect("active session");
    let mut entries = session.list_entries().unwrap();
    sort_by_title(&mut entries);
    entries.into_iter().map(|e| e.title).collect()
}

fn open(manager: &SessionManager, path: &Path) {
    manager.open(PASSWORD, path).expect("open session");
}

// ---------------------------------------------------------------------------
// Opening
// ---------------------------------------------------------------------------

#[test]
fn open_installs_an_active_session() {
    let (_dir, path) = new_vault();
    let (_clock, manager) = manual_manager();
    assert_eq!(manager.state(), SessionState::Closed);

    let session = manager.open(PASSWORD, &path).unwrap();
    assert_eq!(manager.state(), SessionState::Active);
    assert_eq!(session.entry_count().unwrap(), 0);
    assert_eq!(session.path().unwrap(), path);
    assert!(manager.current().is_some());
}

#[test]
fn wrong_password_leaves_manager_closed_and_file_untouched() {
    let (_dir, path) = new_vault();
    let before = fs::read(&path).unwrap();
    let (_clock, manager) = manual_manager();

    let result = manager.open(b"Correct-Horse-2", &path);
    assert!(matches!(result, Err(VaultError::AuthenticationFailed)));
    assert_eq!(manager.state(), SessionState::Closed);
    assert!(manager.current().is_none());
    assert_eq!(fs::read(&path).unwrap(), before);

    // The right password still works afterwards.
    open(&manager, &path);
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn second_open_while_active_is_rejected() {
    let (_dir, path) = new_vault();
    let (_clock, manager) = manual_manager();
    open(&manager, &path);

    assert!(matches!(
        manager.open(PASSWORD, &path),
        Err(VaultError::SessionAlreadyActive)
    ));
    assert_eq!(manager.state(), SessionState::Active);
}

#[test]
fn open_replaces_an_expired_session() {
    let (_dir, path) = new_vault();
    let (clock, manager) = manual_manager();
    let old = manager.open(PASSWORD, &path).unwrap();

    clock.advance(TIMEOUT + EPSILON);
    assert_eq!(manager.state(), SessionState::Expired);

    let new = manager.open(PASSWORD, &path).unwrap();
    assert_eq!(manager.state(), SessionState::Active);
    assert!(new.entry_count().is_ok());
    assert!(matches!(old.entry_count(), Err(VaultError::NoActiveSession)));
}

// ---------------------------------------------------------------------------
// Sliding expiry
// ---------------------------------------------------------------------------

#[test]
fn access_just_before_timeout_keeps_and_resets_the_window() {
    let (_dir, path) = new_vault();
    let (clock, manager) = manual_manager();
    open(&manager, &path);

    clock.advance(TIMEOUT - EPSILON);
    assert!(manager.current().is_some(), "T - eps must still be active");

    // Nearly two full timeouts since open, but under one since last access.
    clock.advance(TIMEOUT - EPSILON);
    assert!(manager.current().is_some(), "window must restart on access");
}

#[test]
fn access_just_after_timeout_expires_and_wipes() {
    let (_dir, path) = new_vault();
    let (clock, manager) = manual_manager();
    let session = manager.open(PASSWORD, &path).unwrap();

    clock.advance(TIMEOUT + EPSILON);
    assert!(manager.current().is_none(), "T + eps must be expired");
    assert_eq!(manager.state(), SessionState::Closed);
    assert!(matches!(
        session.list_entries(),
        Err(VaultError::NoActiveSession)
    ));
}

#[test]
fn handle_operations_extend_the_window() {
    let (_dir, path) = new_vault();
    let (clock, manager) = manual_manager();
    let session = manager.open(PASSWORD, &path).unwrap();

    for _ in 0..3 {
        clock.advance(TIMEOUT - EPSILON);
        session.list_entries().expect("still active");
    }
    assert_eq!(manager.state(), SessionState::Active);
}

#[test]
fn handle_operation_after_timeout_reports_expiry() {
    let (_dir, path) = new_vault();
    let (clock, manager) = manual_manager();
    let session = manager.open(PASSWORD, &path).unwrap();

    clock.advance(TIMEOUT + EPSILON);
    assert!(matches!(
        session.add_entry(Entry::new("Late", "u", "p")),
        Err(VaultError::SessionExpired)
    ));
    assert!(matches!(
        session.list_entries(),
        Err(VaultError::NoActiveSession)
    ));
    assert!(matches!(manager.persist(), Err(VaultError::NoActiveSession)));
}

#[test]
fn state_does_not_extend_the_window() {
    let (_dir, path) = new_vault();
    let (clock, manager) = manual_manager();
    open(&manager, &path);

    clock.advance(TIMEOUT - EPSILON);
    assert_eq!(manager.state(), SessionState::Active);
    clock.advance(EPSILON * 2);
    assert_eq!(manager.state(), SessionState::Expired);
    assert!(manager.current().is_none());
}

// ---------------------------------------------------------------------------
// Closing
// ---------------------------------------------------------------------------

#[test]
fn close_invalidates_outstanding_handles() {
    let (_dir, path) = new_vault();
    let (_clock, manager) = manual_manager();
    let session = manager.open(PASSWORD, &path).unwrap();

    manager.close();
    assert_eq!(manager.state(), SessionState::Closed);
    assert!(manager.current().is_none());
    assert!(matches!(
        session.get_entry("anything"),
        Err(VaultError::NoActiveSession)
    ));
    manager.close();
}

#[test]
fn stale_handle_does_not_reach_a_newer_session() {
    let (_dir, path) = new_vault();
    let (_clock, manager) = manual_manager();
    let first = manager.open(PASSWORD, &path).unwrap();
    manager.close();
    let second = manager.open(PASSWORD, &path).unwrap();

    assert!(matches!(
        first.add_entry(Entry::new("Sneaky", "u", "p")),
        Err(VaultError::NoActiveSession)
    ));
    assert_eq!(second.entry_count().unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Entries through a session
// ---------------------------------------------------------------------------

#[test]
fn entry_lifecycle() {
    let (_dir, path) = new_vault();
    let (_clock, manager) = manual_manager();
    let session = manager.open(PASSWORD, &path).unwrap();

    let entry = Entry::new("Email", "me@example.com", "p@ss").with_notes("recovery codes in safe");
    let id = entry.id.clone();
    session.add_entry(entry.clone()).unwrap();
    assert_eq!(session.get_entry(&id).unwrap(), entry);

    let mut changed = entry.clone();
    changed.password = "n3w-p@ss".into();
    let stored = session.update_entry(changed).unwrap();
    assert_eq!(stored.created_at, entry.created_at);
    assert!(stored.updated_at >= entry.updated_at);
    assert_eq!(session.get_entry(&id).unwrap().password, "n3w-p@ss");

    let removed = session.delete_entry(&id).unwrap();
    assert_eq!(removed.id, id);
    assert!(matches!(
        session.get_entry(&id),
        Err(VaultError::EntryNotFound(_))
    ));
    assert!(matches!(
        session.delete_entry(&id),
        Err(VaultError::EntryNotFound(_))
    ));
}

#[test]
fn view_advances_accessed_at_but_get_does_not() {
    let (_dir, path) = new_vault();
    let (_clock, manager) = manual_manager();
    let session = manager.open(PASSWORD, &path).unwrap();
    let entry = Entry::new("Bank", "me", "1234");
    session.add_entry(entry.clone()).unwrap();

    assert_eq!(session.get_entry(&entry.id).unwrap().accessed_at, entry.accessed_at);
    let viewed = session.view_entry(&entry.id).unwrap();
    assert!(viewed.accessed_at >= entry.accessed_at);
    assert_eq!(viewed.updated_at, entry.updated_at);
}

#[test]
fn persisted_entries_survive_close_and_reopen() {
    let (_dir, path) = new_vault();
    let (_clock, manager) = manual_manager();
    let session = manager.open(PASSWORD, &path).unwrap();

    let entries = [
        Entry::new("GitHub", "octocat", "gh-secret").with_url("https://github.com"),
        Entry::new("Email", "me@example.com", "Correct-Horse-1").with_tags(["personal"]),
        Entry::new("Bank", "1234-5678", "pin"),
    ];
    for e in &entries {
        session.add_entry(e.clone()).unwrap();
    }
    session.persist().unwrap();
    manager.close();

    let (_clock, reopened) = manual_manager();
    let session = reopened.open(PASSWORD, &path).unwrap();
    for e in &entries {
        assert_eq!(&session.get_entry(&e.id).unwrap(), e);
    }
    assert_eq!(titles(&reopened), ["Bank", "Email", "GitHub"]);
}

#[test]
fn viewed_entry_survives_reopen_with_only_accessed_at_advanced() {
    let (_dir, path) = new_vault();
    let (_clock, manager) = manual_manager();
    let session = manager.open(PASSWORD, &path).unwrap();
    let entry = Entry::new("Email", "me@x.com", "p@ss");
    let id = entry.id.clone();
    session.add_entry(entry).unwrap();
    session.persist().unwrap();
    manager.close();

    let session = manager.open(PASSWORD, &path).unwrap();
    let stored = session.get_entry(&id).unwrap();
    std::thread::sleep(Duration::from_millis(10));
    session.view_entry(&id).unwrap();
    session.persist().unwrap();
    manager.close();

    let session = manager.open(PASSWORD, &path).unwrap();
    let reopened = session.get_entry(&id).unwrap();
    assert!(reopened.accessed_at > stored.accessed_at);
    assert_eq!(
        Entry {
            accessed_at: stored.accessed_at,
            ..reopened
        },
        stored
    );
}

#[test]
fn unsaved_changes_are_lost_on_close() {
    let (_dir, path) = new_vault();
    let (_clock, manager) = manual_manager();
    let session = manager.open(PASSWORD, &path).unwrap();
    session.add_entry(Entry::new("Draft", "u", "p")).unwrap();
    manager.close();

    let session = manager.open(PASSWORD, &path).unwrap();
    assert_eq!(session.entry_count().unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Concurrent writers
// ---------------------------------------------------------------------------

#[test]
fn persist_detects_a_newer_container_on_disk() {
    let (_dir, path) = new_vault();
    let (_c1, first) = manual_manager();
    let (_c2, second) = manual_manager();
    let a = first.open(PASSWORD, &path).unwrap();
    let b = second.open(PASSWORD, &path).unwrap();

    a.add_entry(Entry::new("From A", "u", "p")).unwrap();
    a.persist().unwrap();

    b.add_entry(Entry::new("From B", "u", "p")).unwrap();
    assert!(matches!(b.persist(), Err(VaultError::VaultModified(_))));

    // A keeps saving fine; its own writes do not count as foreign.
    a.add_entry(Entry::new("From A again", "u", "p")).unwrap();
    a.persist().unwrap();
    first.close();
    second.close();

    let (_c3, check) = manual_manager();
    check.open(PASSWORD, &path).unwrap();
    assert_eq!(titles(&check), ["From A", "From A again"]);
}

#[test]
fn persist_after_container_removed_is_vault_modified() {
    let (_dir, path) = new_vault();
    let (_clock, manager) = manual_manager();
    let session = manager.open(PASSWORD, &path).unwrap();

    fs::remove_file(&path).unwrap();
    assert!(matches!(
        session.persist(),
        Err(VaultError::VaultModified(_))
    ));
    assert!(!path.exists());
}
