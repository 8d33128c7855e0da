//! Time-boxed access to a decrypted vault.
//!
//! A `SessionManager` owns at most one `Session`: the decrypted payload,
//! its `DerivedKey`, the container path and the verification hash needed
//! to save again.  Lifecycle:
//!
//! ```text
//! Closed --open--> Active --(idle > timeout, seen on next access)--> Expired --> Closed
//!    ^                |
//!    +-----close------+
//! ```
//!
//! Expiry is lazy: nothing runs in the background, the idle time is
//! checked whenever the session is accessed.  A session nobody touches
//! stays resident until it is closed or the manager is dropped.  Every
//! successful access restarts the idle window (a sliding timeout).
//!
//! Dropping a `Session` for any reason (close, expiry, drop of the
//! manager) zeroes the key and the entries' secret fields.
//!
//! Entry reads take the read lock; mutations and state transitions take
//! the write lock.  Opening while a live session exists is rejected with
//! `SessionAlreadyActive`; an expired one is cleared and replaced.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use tracing::{debug, info};
use zeroize::Zeroize;

use super::entry::Entry;
use super::format;
use super::payload::VaultPayload;
use crate::crypto::keys::DerivedKey;
use crate::errors::{Result, VaultError};

/// Idle time after which a session expires.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(15 * 60);

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// Source of monotonic time for idle tracking.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when `advance` is called.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Observable state of a manager, without touching the idle window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Active,
    /// Installed but idle for longer than the timeout; the next access
    /// will wipe it.
    Expired,
}

struct Session {
    id: u64,
    payload: VaultPayload,
    key: DerivedKey,
    path: PathBuf,
    verification_hash: String,
    /// Container `updated_at` as of our last load or save.
    disk_updated_at: DateTime<Utc>,
    last_activity: Mutex<Instant>,
}

impl Session {
    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_activity.lock())
    }

    fn touch(&self, now: Instant) {
        *self.last_activity.lock() = now;
    }

    fn persist(&mut self) -> Result<()> {
        format::ensure_unmodified(&self.path, self.disk_updated_at)?;
        self.disk_updated_at = format::save(
            &mut self.payload,
            &self.path,
            &self.key,
            &self.verification_hash,
        )?;
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // `key` zeroes itself when it drops right after this.
        self.payload.wipe();
        self.verification_hash.zeroize();
    }
}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Owner of the single decrypted session.
pub struct SessionManager {
    timeout: Duration,
    clock: Arc<dyn Clock>,
    slot: RwLock<Option<Session>>,
    next_id: AtomicU64,
}

impl SessionManager {
    /// A manager on the system clock with the given idle timeout.
    pub fn new(timeout: Duration) -> Self {
        Self::with_clock(timeout, Arc::new(SystemClock))
    }

    pub fn with_clock(timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            timeout,
            clock,
            slot: RwLock::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Current state, without extending or expiring anything.
    pub fn state(&self) -> SessionState {
        let now = self.clock.now();
        match self.slot.read().as_ref() {
            None => SessionState::Closed,
            Some(s) if self.is_stale(s, now) => SessionState::Expired,
            Some(_) => SessionState::Active,
        }
    }

    /// Unlock the vault at `path` and install it as the active session.
    ///
    /// Fails with `SessionAlreadyActive` if a live session exists.  On any
    /// failure the manager is left as it was (minus a stale session,
    /// which is cleared either way).
    pub fn open(&self, password: &[u8], path: &Path) -> Result<SessionHandle<'_>> {
        let mut slot = self.slot.write();

        let now = self.clock.now();
        if let Some(existing) = slot.as_ref() {
            if !self.is_stale(existing, now) {
                return Err(VaultError::SessionAlreadyActive);
            }
            Self::clear(&mut slot, "expired session cleared before open");
        }

        let loaded = format::load(path, password)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        *slot = Some(Session {
            id,
            payload: loaded.payload,
            key: loaded.key,
            path: path.to_path_buf(),
            verification_hash: loaded.verification_hash,
            disk_updated_at: loaded.updated_at,
            last_activity: Mutex::new(self.clock.now()),
        });

        info!(
            session = id,
            path = %path.display(),
            timeout_secs = self.timeout.as_secs(),
            "session opened"
        );
        Ok(SessionHandle {
            manager: self,
            session_id: id,
        })
    }

    /// The active session, if any.
    ///
    /// An installed session that has been idle for longer than the
    /// timeout is wiped here and `None` is returned.  Otherwise its idle
    /// window restarts.
    pub fn current(&self) -> Option<SessionHandle<'_>> {
        let now = self.clock.now();
        {
            let slot = self.slot.read();
            match slot.as_ref() {
                None => return None,
                Some(s) if !self.is_stale(s, now) => {
                    s.touch(now);
                    return Some(SessionHandle {
                        manager: self,
                        session_id: s.id,
                    });
                }
                Some(_) => {}
            }
        }

        self.expire_if_stale();
        None
    }

    /// End the session, if any, wiping its key material.
    pub fn close(&self) {
        let mut slot = self.slot.write();
        if slot.is_some() {
            Self::clear(&mut slot, "session closed");
        }
    }

    /// Re-encrypt and write the active session's payload to its container.
    pub fn persist(&self) -> Result<()> {
        self.write(None, Session::persist)
    }

    // ------------------------------------------------------------------
    // Lock helpers
    // ------------------------------------------------------------------

    fn is_stale(&self, session: &Session, now: Instant) -> bool {
        session.idle_for(now) > self.timeout
    }

    fn clear(slot: &mut RwLockWriteGuard<'_, Option<Session>>, reason: &str) {
        if let Some(session) = slot.take() {
            info!(session = session.id, "{reason}");
        }
    }

    fn expire_if_stale(&self) {
        let mut slot = self.slot.write();
        let now = self.clock.now();
        if slot.as_ref().is_some_and(|s| self.is_stale(s, now)) {
            Self::clear(&mut slot, "session expired after inactivity");
        }
    }

    /// Run `f` on the live session under the read lock.
    fn read<T>(&self, expected: Option<u64>, f: impl FnOnce(&Session) -> Result<T>) -> Result<T> {
        let now = self.clock.now();
        {
            let slot = self.slot.read();
            match slot.as_ref() {
                None => return Err(VaultError::NoActiveSession),
                Some(s) if expected.is_some_and(|id| id != s.id) => {
                    return Err(VaultError::NoActiveSession)
                }
                Some(s) if !self.is_stale(s, now) => {
                    s.touch(now);
                    return f(s);
                }
                Some(_) => {}
            }
        }

        self.expire_if_stale();
        Err(VaultError::SessionExpired)
    }

    /// Run `f` on the live session under the write lock.
    fn write<T>(
        &self,
        expected: Option<u64>,
        f: impl FnOnce(&mut Session) -> Result<T>,
    ) -> Result<T> {
        let mut slot = self.slot.write();
        let now = self.clock.now();

        let stale = match slot.as_ref() {
            None => return Err(VaultError::NoActiveSession),
            Some(s) if expected.is_some_and(|id| id != s.id) => {
                return Err(VaultError::NoActiveSession)
            }
            Some(s) => self.is_stale(s, now),
        };
        if stale {
            Self::clear(&mut slot, "session expired after inactivity");
            return Err(VaultError::SessionExpired);
        }

        let Some(session) = slot.as_mut() else {
            return Err(VaultError::NoActiveSession);
        };
        session.touch(now);
        f(session)
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("timeout", &self.timeout)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Access to the entries of one particular session.
///
/// A handle is tied to the session it was issued for: once that session
/// is closed or expires, every call fails, even if a new session has
/// been opened since.  Each call checks and extends the idle window.
#[derive(Clone, Copy)]
pub struct SessionHandle<'a> {
    manager: &'a SessionManager,
    session_id: u64,
}

impl SessionHandle<'_> {
    /// Path of the container backing this session.
    pub fn path(&self) -> Result<PathBuf> {
        self.manager
            .read(Some(self.session_id), |s| Ok(s.path.clone()))
    }

    pub fn entry_count(&self) -> Result<usize> {
        self.manager
            .read(Some(self.session_id), |s| Ok(s.payload.entry_count()))
    }

    /// Snapshot of all entries, unordered.  Sort by title for display.
    pub fn list_entries(&self) -> Result<Vec<Entry>> {
        self.manager
            .read(Some(self.session_id), |s| Ok(s.payload.list_entries()))
    }

    /// Fetch an entry without marking it as viewed.
    pub fn get_entry(&self, id: &str) -> Result<Entry> {
        self.manager
            .read(Some(self.session_id), |s| s.payload.get_entry(id))
    }

    /// Fetch an entry for display, advancing its `accessed_at`.
    pub fn view_entry(&self, id: &str) -> Result<Entry> {
        self.manager
            .write(Some(self.session_id), |s| s.payload.touch_entry(id))
    }

    pub fn add_entry(&self, entry: Entry) -> Result<()> {
        let id = entry.id.clone();
        self.manager
            .write(Some(self.session_id), |s| s.payload.add_entry(entry))?;
        debug!(entry_id = %id, "entry added");
        Ok(())
    }

    /// Replace the entry with the same id; returns the stored copy.
    pub fn update_entry(&self, entry: Entry) -> Result<Entry> {
        let stored = self
            .manager
            .write(Some(self.session_id), |s| s.payload.update_entry(entry))?;
        debug!(entry_id = %stored.id, "entry updated");
        Ok(stored)
    }

    /// Remove an entry permanently; returns what was removed.
    pub fn delete_entry(&self, id: &str) -> Result<Entry> {
        let removed = self
            .manager
            .write(Some(self.session_id), |s| s.payload.delete_entry(id))?;
        debug!(entry_id = %id, "entry deleted");
        Ok(removed)
    }

    /// Save this session's payload back to its container.
    pub fn persist(&self) -> Result<()> {
        self.manager.write(Some(self.session_id), Session::persist)
    }
}

impl fmt::Debug for SessionHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .finish()
    }
}
