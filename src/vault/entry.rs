//! The password entry stored inside a vault payload.
//!
//! Entry ids are random v4 UUIDs, so two entries created in the same
//! instant can never share an id by construction.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroize;

/// Generate a new random entry id.
pub fn new_entry_id() -> String {
    Uuid::new_v4().to_string()
}

/// A single credential stored in the vault.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique id, also the key of the payload's entry map.
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Free-form extra fields (e.g. "security question").
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, String>,

    pub created_at: DateTime<Utc>,

    /// Advances on every mutation.
    pub updated_at: DateTime<Utc>,

    /// Advances every time the entry is viewed.
    pub accessed_at: DateTime<Utc>,
}

impl Entry {
    /// Create a new entry with a fresh id and all three timestamps equal.
    pub fn new(
        title: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_entry_id(),
            title: title.into(),
            username: username.into(),
            password: password.into(),
            url: None,
            notes: None,
            tags: Vec::new(),
            custom: BTreeMap::new(),
            created_at: now,
            updated_at: now,
            accessed_at: now,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Overwrite the sensitive fields in place.
    pub(crate) fn wipe(&mut self) {
        self.password.zeroize();
        if let Some(notes) = self.notes.as_mut() {
            notes.zeroize();
        }
        for value in self.custom.values_mut() {
            value.zeroize();
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("url", &self.url)
            .field("tags", &self.tags)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .field("accessed_at", &self.accessed_at)
            .finish_non_exhaustive()
    }
}
