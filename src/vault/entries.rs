//! Entry CRUD over a decrypted payload.
//!
//! These methods do no locking of their own.  They are only reachable
//! through `SessionHandle`, which calls them under the session lock.

use chrono::Utc;

use super::entry::Entry;
use super::payload::VaultPayload;
use crate::errors::{Result, VaultError};

impl VaultPayload {
    /// Insert a new entry.  Titles may repeat; ids may not.
    pub(crate) fn add_entry(&mut self, entry: Entry) -> Result<()> {
        if self.entries.contains_key(&entry.id) {
            return Err(VaultError::EntryAlreadyExists(entry.id));
        }
        self.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    pub(crate) fn get_entry(&self, id: &str) -> Result<Entry> {
        self.entries
            .get(id)
            .cloned()
            .ok_or_else(|| VaultError::EntryNotFound(id.to_string()))
    }

    /// Snapshot of every entry, in no particular order.
    pub(crate) fn list_entries(&self) -> Vec<Entry> {
        self.entries.values().cloned().collect()
    }

    /// Replace an existing entry, keeping its original `created_at`.
    ///
    /// Returns the stored copy with `updated_at` advanced.  An unknown id
    /// fails without inserting anything.
    pub(crate) fn update_entry(&mut self, mut entry: Entry) -> Result<Entry> {
        let existing = self
            .entries
            .get_mut(&entry.id)
            .ok_or_else(|| VaultError::EntryNotFound(entry.id.clone()))?;

        entry.created_at = existing.created_at;
        entry.updated_at = Utc::now();
        existing.wipe();
        *existing = entry;
        Ok(existing.clone())
    }

    /// Remove an entry for good and return it.
    pub(crate) fn delete_entry(&mut self, id: &str) -> Result<Entry> {
        self.entries
            .remove(id)
            .ok_or_else(|| VaultError::EntryNotFound(id.to_string()))
    }

    /// Mark an entry as viewed and return it.
    pub(crate) fn touch_entry(&mut self, id: &str) -> Result<Entry> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| VaultError::EntryNotFound(id.to_string()))?;
        entry.accessed_at = Utc::now();
        Ok(entry.clone())
    }
}

/// Sort a snapshot by title, the order `list` shows entries in.
///
/// Ties are broken by id so the order is at least deterministic for a
/// given snapshot.  It is not stable across inserts and deletes.
pub fn sort_by_title(entries: &mut [Entry]) {
    entries.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
}
