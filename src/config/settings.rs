use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::{Argon2Params, KdfProfile};
use crate::errors::{Result, VaultError};

/// User-level configuration, loaded from `<config dir>/config.toml`.
///
/// Every field has a sensible default so passvault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Vault container path.  Relative paths are resolved against the
    /// config directory; unset means `<config dir>/vault.json`.
    #[serde(default)]
    pub vault_file: Option<String>,

    /// Idle minutes before an unlocked session expires (default: 15).
    #[serde(default = "default_session_timeout_minutes")]
    pub session_timeout_minutes: u64,

    /// Encryption-key Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Encryption-key Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Encryption-key Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// Verification-hash Argon2 memory cost in KiB (default: 19 MB).
    #[serde(default = "default_verify_memory_kib")]
    pub verify_memory_kib: u32,

    /// Verification-hash Argon2 iteration count (default: 2).
    #[serde(default = "default_verify_iterations")]
    pub verify_iterations: u32,

    /// Verification-hash Argon2 parallelism degree (default: 1).
    #[serde(default = "default_verify_parallelism")]
    pub verify_parallelism: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_session_timeout_minutes() -> u64 {
    15
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_verify_memory_kib() -> u32 {
    19_456 // 19 MB
}

fn default_verify_iterations() -> u32 {
    2
}

fn default_verify_parallelism() -> u32 {
    1
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_file: None,
            session_timeout_minutes: default_session_timeout_minutes(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            verify_memory_kib: default_verify_memory_kib(),
            verify_iterations: default_verify_iterations(),
            verify_parallelism: default_verify_parallelism(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the config directory.
    pub const FILE_NAME: &'static str = "config.toml";

    /// Default container file name inside the config directory.
    const VAULT_FILE_NAME: &'static str = "vault.json";

    /// Load settings from `<config_dir>/config.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.session_timeout_minutes == 0 {
            return Err(VaultError::ConfigError(format!(
                "{}: session_timeout_minutes must be at least 1",
                config_path.display()
            )));
        }

        Ok(settings)
    }

    /// The platform config directory joined with `passvault`
    /// (e.g. `~/.config/passvault` on Linux).
    pub fn default_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("passvault"))
            .ok_or_else(|| {
                VaultError::ConfigError("could not determine the user config directory".into())
            })
    }

    /// Build the full path to the vault container.
    ///
    /// Example: `<config_dir>/vault.json`
    pub fn vault_path(&self, config_dir: &Path) -> PathBuf {
        match &self.vault_file {
            Some(file) => config_dir.join(file),
            None => config_dir.join(Self::VAULT_FILE_NAME),
        }
    }

    /// Sliding idle timeout for unlocked sessions.
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_minutes.saturating_mul(60))
    }

    /// Convert the encryption-key settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    /// Convert the verification-hash settings into crypto-layer params.
    pub fn verify_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.verify_memory_kib,
            iterations: self.verify_iterations,
            parallelism: self.verify_parallelism,
        }
    }

    /// Both KDF settings, as used when creating a vault.
    pub fn kdf_profile(&self) -> KdfProfile {
        KdfProfile {
            encryption: self.argon2_params(),
            verification: self.verify_params(),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.vault_file, None);
        assert_eq!(s.session_timeout_minutes, 15);
        assert_eq!(s.argon2_memory_kib, 65_536);
        assert_eq!(s.argon2_iterations, 3);
        assert_eq!(s.argon2_parallelism, 4);
        assert_eq!(s.verify_memory_kib, 19_456);
        assert_eq!(s.verify_iterations, 2);
        assert_eq!(s.verify_parallelism, 1);
    }

    #[test]
    fn default_profile_matches_crypto_defaults() {
        assert_eq!(Settings::default().kdf_profile(), KdfProfile::default());
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.session_timeout_minutes, 15);
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
vault_file = "work.json"
session_timeout_minutes = 5
argon2_memory_kib = 131072
argon2_iterations = 5
argon2_parallelism = 8
verify_memory_kib = 32768
verify_iterations = 4
verify_parallelism = 2
"#;
        fs::write(tmp.path().join("config.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.vault_file.as_deref(), Some("work.json"));
        assert_eq!(settings.session_timeout(), Duration::from_secs(300));
        assert_eq!(settings.argon2_memory_kib, 131_072);
        assert_eq!(settings.argon2_iterations, 5);
        assert_eq!(settings.argon2_parallelism, 8);
        assert_eq!(settings.verify_params().memory_kib, 32_768);
        assert_eq!(settings.verify_params().iterations, 4);
        assert_eq!(settings.verify_params().parallelism, 2);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "session_timeout_minutes = 30\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.session_timeout_minutes, 30);
        // Rest should be defaults
        assert_eq!(settings.vault_file, None);
        assert_eq!(settings.argon2_iterations, 3);
        assert_eq!(settings.verify_iterations, 2);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "not valid {{toml").unwrap();

        let result = Settings::load(tmp.path());
        assert!(matches!(result, Err(VaultError::ConfigError(_))));
    }

    #[test]
    fn load_rejects_zero_timeout() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "session_timeout_minutes = 0\n").unwrap();

        assert!(matches!(
            Settings::load(tmp.path()),
            Err(VaultError::ConfigError(_))
        ));
    }

    #[test]
    fn vault_path_defaults_to_config_dir() {
        let s = Settings::default();
        let dir = Path::new("/home/user/.config/passvault");
        assert_eq!(
            s.vault_path(dir),
            PathBuf::from("/home/user/.config/passvault/vault.json")
        );
    }

    #[test]
    fn vault_path_respects_custom_vault_file() {
        let relative = Settings {
            vault_file: Some("work.json".to_string()),
            ..Settings::default()
        };
        let dir = Path::new("/home/user/.config/passvault");
        assert_eq!(
            relative.vault_path(dir),
            PathBuf::from("/home/user/.config/passvault/work.json")
        );

        let absolute = Settings {
            vault_file: Some("/srv/vaults/main.json".to_string()),
            ..Settings::default()
        };
        assert_eq!(
            absolute.vault_path(dir),
            PathBuf::from("/srv/vaults/main.json")
        );
    }
}
