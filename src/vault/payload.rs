//! The decrypted vault payload.
//!
//! This is what the container's `encrypted_payload` decrypts to.  The
//! `entries` map is the only record of which entries exist.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::Entry;
use crate::errors::{Result, VaultError};

/// Current schema version of the decrypted payload.
pub const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Clone, Serialize, Deserialize)]
pub struct VaultPayload {
    pub schema_version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Entry id -> entry.
    #[serde(default)]
    pub(crate) entries: HashMap<String, Entry>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl VaultPayload {
    /// An empty payload stamped with the current time.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            created_at: now,
            updated_at: now,
            entries: HashMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Parse decrypted bytes and check the payload is well-formed.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let payload: VaultPayload = serde_json::from_slice(bytes)
            .map_err(|e| VaultError::CorruptVault(format!("payload JSON: {e}")))?;
        payload.validate()?;
        Ok(payload)
    }

    /// Every map key must equal the id of the entry stored under it.
    fn validate(&self) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(VaultError::CorruptVault(format!(
                "unsupported payload schema {}, expected {SCHEMA_VERSION}",
                self.schema_version
            )));
        }
        if let Some((key, entry)) = self.entries.iter().find(|(k, e)| **k != e.id) {
            return Err(VaultError::CorruptVault(format!(
                "entry stored under '{key}' has id '{}'",
                entry.id
            )));
        }
        Ok(())
    }

    /// Number of entries in the payload.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Overwrite every sensitive entry field in place.
    pub(crate) fn wipe(&mut self) {
        for entry in self.entries.values_mut() {
            entry.wipe();
        }
    }
}

impl Default for VaultPayload {
    fn default() -> Self {
        Self::new()
    }
}
