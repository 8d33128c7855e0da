//! Vault module — the encrypted container and access to its entries.
//!
//! This module provides:
//! - `Entry` records and the decrypted `VaultPayload` (`entry`, `payload`, `entries`)
//! - The on-disk JSON container with create/load/save (`format`)
//! - Time-boxed, locked access to an unlocked vault (`session`)

pub mod entries;
pub mod entry;
pub mod format;
pub mod payload;
pub mod session;

// Re-export the most commonly used items.
pub use entries::sort_by_title;
pub use entry::{new_entry_id, Entry};
pub use format::{
    create, ensure_unmodified, load, read_envelope, save, vault_exists, LoadedVault, VaultFile,
};
pub use payload::VaultPayload;
pub use session::{
    Clock, ManualClock, SessionHandle, SessionManager, SessionState, SystemClock,
    DEFAULT_SESSION_TIMEOUT,
};
