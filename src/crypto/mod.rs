//! Cryptographic primitives for passvault.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - Argon2id key derivation and master-password verification (`kdf`)
//! - The zeroize-on-drop `DerivedKey` buffer (`keys`)

pub mod encryption;
pub mod kdf;
pub mod keys;

pub use encryption::{decrypt, encrypt};
pub use kdf::{
    derive_encryption_key, derive_encryption_key_with_params, generate_salt,
    hash_master_password, hash_master_password_with_params, verify_master_password,
    Argon2Params, KdfProfile,
};
pub use keys::{DerivedKey, KEY_LEN, SALT_LEN};
