//! The derived encryption key held by an open session.
//!
//! `DerivedKey` owns the 32-byte AES key together with the salt and
//! Argon2 parameters it was derived from (neither is secret, but the
//! container needs both on every save).  The struct is not `Clone`:
//! exactly one owner exists, and its bytes are zeroed when that owner
//! drops it.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::kdf::Argon2Params;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Length of the encryption-key salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// A symmetric vault key that is wiped from memory on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
    salt: [u8; SALT_LEN],
    #[zeroize(skip)]
    params: Argon2Params,
}

impl DerivedKey {
    /// Wrap raw key bytes with the salt and params they came from.
    ///
    /// The caller should zeroize its own copy of `bytes` afterwards.
    pub fn new(bytes: [u8; KEY_LEN], salt: [u8; SALT_LEN], params: Argon2Params) -> Self {
        Self {
            bytes,
            salt,
            params,
        }
    }

    /// Access the raw key bytes (e.g. to pass to the AEAD codec).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// The salt this key was derived from.
    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    /// The Argon2id parameters this key was derived with.
    pub fn params(&self) -> Argon2Params {
        self.params
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
