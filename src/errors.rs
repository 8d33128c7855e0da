use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in passvault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Wrong master password, truncated ciphertext, or a failed
    /// authentication tag. Callers cannot tell these apart.
    #[error("Invalid master password")]
    AuthenticationFailed,

    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault errors ---
    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    #[error("Vault file is corrupt: {0}")]
    CorruptVault(String),

    #[error("Vault at {0} was modified by another process since it was opened")]
    VaultModified(PathBuf),

    // --- Session errors ---
    #[error("No active session, unlock the vault first")]
    NoActiveSession,

    #[error("Session expired after inactivity, unlock the vault again")]
    SessionExpired,

    #[error("A session is already active, close it before opening another")]
    SessionAlreadyActive,

    // --- Entry errors ---
    #[error("Entry '{0}' not found")]
    EntryNotFound(String),

    #[error("Entry id '{0}' already exists")]
    EntryAlreadyExists(String),

    #[error("No entry matches '{0}' (use an id or a number from `passvault list`)")]
    InvalidEntryReference(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Convenience type alias for passvault results.
pub type Result<T> = std::result::Result<T, VaultError>;
