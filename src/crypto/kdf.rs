//! Password-based key derivation and master-password verification.
//!
//! Two independent Argon2id invocations are used:
//!
//! - **Encryption key**: raw Argon2id output over the master password and
//!   the container salt.  Its parameters are stored in the container
//!   header so they can be tuned without breaking older vaults.
//! - **Verification hash**: a self-describing PHC string
//!   (`$argon2id$v=19$m=...,t=...,p=...$<salt>$<digest>`) carrying its own
//!   random salt and parameters.  It lets `load` reject a wrong password
//!   before any decryption is attempted.

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::Zeroize;

use super::keys::{DerivedKey, KEY_LEN, SALT_LEN};
use crate::errors::{Result, VaultError};

/// Length of the random salt embedded in the verification hash.
const VERIFY_SALT_LEN: usize = 16;

/// Minimum safe memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Maximum memory cost in KiB (4 GB).
const MAX_MEMORY_KIB: u32 = 4 * 1024 * 1024;

const MAX_ITERATIONS: u32 = 64;

const MAX_PARALLELISM: u32 = 64;

/// Configurable Argon2id parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of iterations.
    pub iterations: u32,
    /// Parallelism lanes.
    pub parallelism: u32,
}

impl Default for Argon2Params {
    /// Encryption-key defaults: 64 MB, 3 iterations, 4 lanes.
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// Verification-hash defaults: 19 MB, 2 iterations, 1 lane.
    pub fn verification_default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }

    /// Check the parameters against the accepted floor and ceiling.
    ///
    /// Returns a description of the first violation.  Settings read back
    /// from a container go through this before any hashing, so an edited
    /// file cannot request an unbounded allocation.
    pub fn check_bounds(&self) -> std::result::Result<(), String> {
        if !(MIN_MEMORY_KIB..=MAX_MEMORY_KIB).contains(&self.memory_kib) {
            return Err(format!(
                "Argon2 memory_kib must be between {MIN_MEMORY_KIB} and {MAX_MEMORY_KIB} (got {})",
                self.memory_kib
            ));
        }
        if !(1..=MAX_ITERATIONS).contains(&self.iterations) {
            return Err(format!(
                "Argon2 iterations must be between 1 and {MAX_ITERATIONS} (got {})",
                self.iterations
            ));
        }
        if !(1..=MAX_PARALLELISM).contains(&self.parallelism) {
            return Err(format!(
                "Argon2 parallelism must be between 1 and {MAX_PARALLELISM} (got {})",
                self.parallelism
            ));
        }
        Ok(())
    }

    /// Reject out-of-range settings, then build `argon2::Params`.
    fn to_argon2(self, output_len: Option<usize>) -> Result<Params> {
        self.check_bounds().map_err(VaultError::KeyDerivationFailed)?;

        Params::new(self.memory_kib, self.iterations, self.parallelism, output_len)
            .map_err(|e| VaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))
    }
}

/// The pair of KDF settings used when a vault is created.
///
/// The two halves are tuned separately; neither affects the stored
/// format of the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfProfile {
    pub encryption: Argon2Params,
    pub verification: Argon2Params,
}

impl Default for KdfProfile {
    fn default() -> Self {
        Self {
            encryption: Argon2Params::default(),
            verification: Argon2Params::verification_default(),
        }
    }
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// Derive the vault encryption key with the default parameters.
pub fn derive_encryption_key(password: &[u8], salt: &[u8; SALT_LEN]) -> Result<DerivedKey> {
    derive_encryption_key_with_params(password, salt, &Argon2Params::default())
}

/// Derive the vault encryption key with explicit Argon2id parameters.
///
/// The same password + salt + params always produce the same key.
pub fn derive_encryption_key_with_params(
    password: &[u8],
    salt: &[u8; SALT_LEN],
    params: &Argon2Params,
) -> Result<DerivedKey> {
    let argon2 = Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        params.to_argon2(Some(KEY_LEN))?,
    );

    let mut key = [0u8; KEY_LEN];
    let outcome = argon2.hash_password_into(password, salt, &mut key);
    if let Err(e) = outcome {
        key.zeroize();
        return Err(VaultError::KeyDerivationFailed(format!(
            "Argon2id hashing failed: {e}"
        )));
    }

    let derived = DerivedKey::new(key, *salt, *params);
    key.zeroize();
    Ok(derived)
}

/// Hash the master password for storage, using the default parameters.
pub fn hash_master_password(password: &[u8]) -> Result<String> {
    hash_master_password_with_params(password, &Argon2Params::verification_default())
}

/// Hash the master password into a PHC-encoded Argon2id string.
///
/// A fresh random salt is generated for every call, so hashing the same
/// password twice yields two different strings that both verify.
pub fn hash_master_password_with_params(password: &[u8], params: &Argon2Params) -> Result<String> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2(None)?);

    let mut salt_bytes = [0u8; VERIFY_SALT_LEN];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| VaultError::KeyDerivationFailed(format!("salt encoding: {e}")))?;

    let hash = argon2
        .hash_password(password, &salt)
        .map_err(|e| VaultError::KeyDerivationFailed(format!("password hashing failed: {e}")))?;

    Ok(hash.to_string())
}

/// Check `candidate` against a stored verification hash.
///
/// Parameters and salt come from the encoded string itself and are
/// bounds-checked before hashing.  The digest comparison is constant-time.
/// A mismatch is `Ok(false)`; a malformed or out-of-range hash is
/// `CorruptVault`.
pub fn verify_master_password(candidate: &[u8], encoded_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(encoded_hash)
        .map_err(|e| VaultError::CorruptVault(format!("malformed verification hash: {e}")))?;

    let params = Params::try_from(&parsed)
        .map_err(|e| VaultError::CorruptVault(format!("verification hash params: {e}")))?;
    Argon2Params {
        memory_kib: params.m_cost(),
        iterations: params.t_cost(),
        parallelism: params.p_cost(),
    }
    .check_bounds()
    .map_err(|msg| VaultError::CorruptVault(format!("verification hash: {msg}")))?;

    match Argon2::default().verify_password(candidate, &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(VaultError::CorruptVault(format!(
            "unusable verification hash: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Argon2Params {
        Argon2Params {
            memory_kib: MIN_MEMORY_KIB,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn weak_memory_cost_is_rejected() {
        let params = Argon2Params {
            memory_kib: 1024,
            ..cheap()
        };
        let salt = generate_salt();
        assert!(matches!(
            derive_encryption_key_with_params(b"pw", &salt, &params),
            Err(VaultError::KeyDerivationFailed(_))
        ));
        assert!(hash_master_password_with_params(b"pw", &params).is_err());
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let params = Argon2Params {
            iterations: 0,
            ..cheap()
        };
        assert!(hash_master_password_with_params(b"pw", &params).is_err());
    }

    #[test]
    fn oversized_params_are_rejected_before_hashing() {
        let salt = generate_salt();
        for params in [
            Argon2Params {
                memory_kib: MAX_MEMORY_KIB + 1,
                ..cheap()
            },
            Argon2Params {
                iterations: MAX_ITERATIONS + 1,
                ..cheap()
            },
            Argon2Params {
                parallelism: MAX_PARALLELISM + 1,
                ..cheap()
            },
        ] {
            assert!(params.check_bounds().is_err());
            assert!(matches!(
                derive_encryption_key_with_params(b"pw", &salt, &params),
                Err(VaultError::KeyDerivationFailed(_))
            ));
        }
        assert!(cheap().check_bounds().is_ok());
        assert!(Argon2Params::default().check_bounds().is_ok());
    }

    #[test]
    fn huge_cost_in_verification_hash_is_corrupt() {
        let hash = hash_master_password_with_params(b"pw", &cheap()).unwrap();
        let edited = hash.replace("m=8192,", "m=4000000000,");
        assert_ne!(edited, hash);
        assert!(matches!(
            verify_master_password(b"pw", &edited),
            Err(VaultError::CorruptVault(_))
        ));

        let weak = hash.replace("m=8192,", "m=1024,");
        assert!(matches!(
            verify_master_password(b"pw", &weak),
            Err(VaultError::CorruptVault(_))
        ));
    }

    #[test]
    fn derived_key_remembers_its_salt() {
        let salt = generate_salt();
        let key = derive_encryption_key_with_params(b"pw", &salt, &cheap()).unwrap();
        assert_eq!(key.salt(), &salt);
    }

    #[test]
    fn verification_hash_is_self_describing() {
        let hash = hash_master_password_with_params(b"pw", &cheap()).unwrap();
        assert!(hash.starts_with("$argon2id$v=19$m=8192,t=1,p=1$"));
    }

    #[test]
    fn hashing_twice_uses_fresh_salts() {
        let h1 = hash_master_password_with_params(b"same", &cheap()).unwrap();
        let h2 = hash_master_password_with_params(b"same", &cheap()).unwrap();
        assert_ne!(h1, h2);
        assert!(verify_master_password(b"same", &h1).unwrap());
        assert!(verify_master_password(b"same", &h2).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        assert!(verify_master_password(b"pw", "not-a-phc-string").is_err());
        assert!(verify_master_password(b"pw", "").is_err());
    }
}
