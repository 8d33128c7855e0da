//! On-disk vault container: a JSON envelope around the encrypted payload.
//!
//! ```text
//! {
//!   "format_version": "1.0.0",
//!   "verification_hash": "$argon2id$v=19$m=19456,t=2,p=1$...",
//!   "salt": "<base64, 32 bytes>",
//!   "kdf_params": { "memory_kib": 65536, "iterations": 3, "parallelism": 4 },
//!   "encrypted_payload": "<base64 of nonce || ciphertext || tag>",
//!   "created_at": "2024-05-01T12:00:00Z",
//!   "updated_at": "2024-05-01T12:00:00Z"
//! }
//! ```
//!
//! The salt and verification hash stay in the clear: both are needed
//! before anything can be decrypted.  Writes go through a temp file in
//! the same directory followed by a rename, so a crash never leaves a
//! half-written container behind.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::payload::VaultPayload;
use crate::crypto::encryption::{decrypt, encrypt};
use crate::crypto::kdf::{
    derive_encryption_key_with_params, generate_salt, hash_master_password_with_params,
    verify_master_password, Argon2Params, KdfProfile,
};
use crate::crypto::keys::{DerivedKey, SALT_LEN};
use crate::errors::{Result, VaultError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Current container format version.
pub const FORMAT_VERSION: &str = "1.0.0";

// ---------------------------------------------------------------------------
// VaultFile
// ---------------------------------------------------------------------------

/// Encryption-key Argon2 parameters as stored in the container.
///
/// Optional in the file: if missing, the defaults (m=64MB, t=3, p=4) are
/// used when re-deriving the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArgon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl From<Argon2Params> for StoredArgon2Params {
    fn from(p: Argon2Params) -> Self {
        Self {
            memory_kib: p.memory_kib,
            iterations: p.iterations,
            parallelism: p.parallelism,
        }
    }
}

impl From<StoredArgon2Params> for Argon2Params {
    fn from(p: StoredArgon2Params) -> Self {
        Self {
            memory_kib: p.memory_kib,
            iterations: p.iterations,
            parallelism: p.parallelism,
        }
    }
}

/// The container as it is serialized to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultFile {
    pub format_version: String,

    /// PHC-encoded Argon2id hash of the master password.
    pub verification_hash: String,

    /// Salt for the encryption-key KDF (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub salt: Vec<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdf_params: Option<StoredArgon2Params>,

    /// nonce || ciphertext || tag (base64 in JSON).
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub encrypted_payload: Vec<u8>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything `load` hands over to a new session.
pub struct LoadedVault {
    pub payload: VaultPayload,
    pub key: DerivedKey,
    pub verification_hash: String,
    /// The container's `updated_at` at the time it was read.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Returns `true` if a container file exists at `path`.
pub fn vault_exists(path: &Path) -> bool {
    path.is_file()
}

/// Create a new, empty vault at `path`.
///
/// Fails with `VaultAlreadyExists` rather than overwriting anything, even
/// when another process creates the same file concurrently.
pub fn create(path: &Path, password: &[u8], profile: &KdfProfile) -> Result<()> {
    if path.exists() {
        return Err(VaultError::VaultAlreadyExists(path.to_path_buf()));
    }

    let salt = generate_salt();
    let key = derive_encryption_key_with_params(password, &salt, &profile.encryption)?;
    let verification_hash = hash_master_password_with_params(password, &profile.verification)?;

    let payload = VaultPayload::new();
    let bytes = encode_container(&payload, &key, &verification_hash)?;
    write_new(path, &bytes)?;

    info!(path = %path.display(), "vault created");
    Ok(())
}

/// Open the container at `path` and decrypt its payload.
///
/// The master password is checked against the stored verification hash
/// first; a wrong password is rejected before any key is derived from
/// the container salt or any ciphertext is touched.
pub fn load(path: &Path, password: &[u8]) -> Result<LoadedVault> {
    let file = read_envelope(path)?;

    let params: Argon2Params = file.kdf_params.map(Into::into).unwrap_or_default();
    params
        .check_bounds()
        .map_err(|msg| VaultError::CorruptVault(format!("stored kdf_params: {msg}")))?;

    if !verify_master_password(password, &file.verification_hash)? {
        warn!(path = %path.display(), "master password rejected");
        return Err(VaultError::AuthenticationFailed);
    }

    let salt: [u8; SALT_LEN] = file.salt.as_slice().try_into().map_err(|_| {
        VaultError::CorruptVault(format!(
            "salt must be {SALT_LEN} bytes, found {}",
            file.salt.len()
        ))
    })?;
    let key = derive_encryption_key_with_params(password, &salt, &params)?;

    let plaintext = Zeroizing::new(decrypt(key.as_bytes(), &file.encrypted_payload)?);
    let payload = VaultPayload::from_json(&plaintext)?;

    debug!(
        path = %path.display(),
        entries = payload.entry_count(),
        "vault decrypted"
    );

    Ok(LoadedVault {
        payload,
        key,
        verification_hash: file.verification_hash,
        updated_at: file.updated_at,
    })
}

/// Encrypt `payload` with `key` and write the full container to `path`.
///
/// Advances the payload's `updated_at` and returns it.  The plaintext
/// serialization is wiped before returning; the key is only borrowed and
/// stays with its owner.
pub fn save(
    payload: &mut VaultPayload,
    path: &Path,
    key: &DerivedKey,
    verification_hash: &str,
) -> Result<DateTime<Utc>> {
    payload.updated_at = Utc::now();

    let bytes = encode_container(payload, key, verification_hash)?;
    write_atomic(path, &bytes)?;

    debug!(
        path = %path.display(),
        entries = payload.entry_count(),
        "vault saved"
    );
    Ok(payload.updated_at)
}

/// Encrypt `payload` and serialize the full container.
fn encode_container(
    payload: &VaultPayload,
    key: &DerivedKey,
    verification_hash: &str,
) -> Result<Vec<u8>> {
    let plaintext = serialize_payload(payload)?;
    let encrypted_payload = encrypt(key.as_bytes(), &plaintext)?;

    let file = VaultFile {
        format_version: FORMAT_VERSION.to_string(),
        verification_hash: verification_hash.to_string(),
        salt: key.salt().to_vec(),
        kdf_params: Some(key.params().into()),
        encrypted_payload,
        created_at: payload.created_at,
        updated_at: payload.updated_at,
    };

    serde_json::to_vec_pretty(&file)
        .map_err(|e| VaultError::SerializationError(format!("container: {e}")))
}

/// Serialize the payload into a buffer sized up front.
///
/// The buffer never reallocates, so no partial copy of the plaintext is
/// left behind in freed memory; the single copy is wiped on drop.
fn serialize_payload(payload: &VaultPayload) -> Result<Zeroizing<Vec<u8>>> {
    let to_err = |e: serde_json::Error| VaultError::SerializationError(format!("payload: {e}"));

    let mut counter = ByteCounter(0);
    serde_json::to_writer(&mut counter, payload).map_err(to_err)?;

    let mut plaintext = Zeroizing::new(Vec::with_capacity(counter.0));
    serde_json::to_writer(&mut *plaintext, payload).map_err(to_err)?;
    Ok(plaintext)
}

/// A writer that only counts the bytes it is given.
struct ByteCounter(usize);

impl Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Fail with `VaultModified` unless the container on disk still carries
/// the `updated_at` this process last saw.
///
/// Only the clear envelope is read; nothing is decrypted.  A container
/// that has disappeared counts as modified.
pub fn ensure_unmodified(path: &Path, expected_updated_at: DateTime<Utc>) -> Result<()> {
    let on_disk = match read_envelope(path) {
        Ok(file) => file.updated_at,
        Err(VaultError::VaultNotFound(_)) => {
            return Err(VaultError::VaultModified(path.to_path_buf()))
        }
        Err(e) => return Err(e),
    };

    if on_disk != expected_updated_at {
        warn!(path = %path.display(), "container changed since it was loaded");
        return Err(VaultError::VaultModified(path.to_path_buf()));
    }
    Ok(())
}

/// Read and parse the container envelope without decrypting anything.
pub fn read_envelope(path: &Path) -> Result<VaultFile> {
    if !path.exists() {
        return Err(VaultError::VaultNotFound(path.to_path_buf()));
    }

    let data = fs::read(path)?;
    let file: VaultFile = serde_json::from_slice(&data)
        .map_err(|e| VaultError::CorruptVault(format!("container JSON: {e}")))?;

    if file.format_version != FORMAT_VERSION {
        return Err(VaultError::CorruptVault(format!(
            "unsupported format version {}, expected {FORMAT_VERSION}",
            file.format_version
        )));
    }

    Ok(file)
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

/// Write `bytes` to a temp file next to `path`, fsync it, then rename it
/// over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    ensure_private_dir(parent)?;

    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    let written = write_private_file(&tmp_path, bytes).and_then(|()| fs::rename(&tmp_path, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    // Persist the rename itself.  Not every platform can fsync a directory.
    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// Write `bytes` to a uniquely named temp file, then hard-link it to
/// `path`.  The link fails if `path` already exists, so a concurrent
/// creator can never be overwritten.
fn write_new(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    ensure_private_dir(parent)?;

    let tmp_path = parent.join(format!(
        ".{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        Uuid::new_v4().simple()
    ));

    let linked = write_private_file(&tmp_path, bytes).and_then(|()| fs::hard_link(&tmp_path, path));
    let _ = fs::remove_file(&tmp_path);
    match linked {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(VaultError::VaultAlreadyExists(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    }

    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// Create (or truncate) a file readable only by the owner and fsync it.
fn write_private_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;

    // `mode` only applies on creation; tighten a pre-existing temp file too.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

/// Create `dir` and any missing parents with owner-only permissions.
fn ensure_private_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }

    builder.create(dir)?;
    debug!(dir = %dir.display(), "created vault directory");
    Ok(())
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
