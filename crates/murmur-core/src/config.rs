use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MurmurError, MurmurResult};

/// PBKDF2-SHA256 iteration floor. Configured values may only go up from here.
pub const MIN_KDF_ITERATIONS: u32 = 100_000;

/// Top-level configuration (loaded from murmur.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MurmurConfig {
    pub crypto: CryptoConfig,
    pub storage: StorageConfig,
    pub directory: DirectoryConfig,
    pub log: LogConfig,
}

impl MurmurConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> MurmurResult<Self> {
        let config: MurmurConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> MurmurResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> MurmurResult<()> {
        if self.crypto.kdf_iterations < MIN_KDF_ITERATIONS {
            return Err(MurmurError::Config(format!(
                "crypto.kdf_iterations = {} is below the minimum of {MIN_KDF_ITERATIONS}",
                self.crypto.kdf_iterations
            )));
        }
        if self.directory.timeout_secs == 0 {
            return Err(MurmurError::Config(
                "directory.timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Key derivation and wrapping parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// PBKDF2-SHA256 iterations for password-derived wrapping keys (default: 100000)
    pub kdf_iterations: u32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: MIN_KDF_ITERATIONS,
        }
    }
}

/// Where wrapped keypairs and contact public keys are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON file on disk (default)
    File,
    /// Platform keychain (macOS Keychain, Linux keyutils, Credential Manager)
    Keychain,
    /// Process memory only; nothing survives exit
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Path of the key store file when `backend = "file"`
    pub path: PathBuf,
}

impl StorageConfig {
    /// The store path with a leading `~/` expanded against `$HOME`.
    pub fn resolved_path(&self) -> PathBuf {
        expand_tilde(&self.path)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: PathBuf::from("~/.local/share/murmur/keys.json"),
        }
    }
}

/// Public key directory (`GET /users/{id}/public-key`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Base URL of the API serving user public keys (unset = offline)
    pub base_url: Option<String>,
    /// Request timeout in seconds (default: 10)
    pub timeout_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Expand a leading `~/` against `$HOME`.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str().and_then(|s| s.strip_prefix("~/")) {
        Some(rest) => home_dir().join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[crypto]
kdf_iterations = 250000

[storage]
backend = "keychain"
path = "/var/lib/murmur/keys.json"

[directory]
base_url = "https://api.example.com"
timeout_secs = 5

[log]
level = "debug"
format = "json"
"#;
        let config = MurmurConfig::from_toml_str(toml_str).unwrap();

        assert_eq!(config.crypto.kdf_iterations, 250_000);
        assert_eq!(config.storage.backend, StorageBackend::Keychain);
        assert_eq!(config.storage.path, PathBuf::from("/var/lib/murmur/keys.json"));
        assert_eq!(
            config.directory.base_url.as_deref(),
            Some("https://api.example.com")
        );
        assert_eq!(config.directory.timeout_secs, 5);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config = MurmurConfig::from_toml_str("").unwrap();

        assert_eq!(config.crypto.kdf_iterations, MIN_KDF_ITERATIONS);
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert!(config.directory.base_url.is_none());
        assert_eq!(config.directory.timeout_secs, 10);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, "text");
    }

    #[test]
    fn test_rejects_weak_kdf_iterations() {
        let err = MurmurConfig::from_toml_str("[crypto]\nkdf_iterations = 1000\n").unwrap_err();
        assert!(matches!(err, MurmurError::Config(_)));
    }

    #[test]
    fn test_rejects_unknown_backend() {
        let err = MurmurConfig::from_toml_str("[storage]\nbackend = \"s3\"\n").unwrap_err();
        assert!(matches!(err, MurmurError::ConfigParse(_)));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MurmurConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.crypto.kdf_iterations, MIN_KDF_ITERATIONS);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("murmur.toml");
        std::fs::write(&path, "[storage]\nbackend = \"memory\"\n").unwrap();

        let config = MurmurConfig::load(&path).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = MurmurConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = MurmurConfig::from_toml_str(&toml_str).unwrap();

        assert_eq!(config.crypto.kdf_iterations, parsed.crypto.kdf_iterations);
        assert_eq!(config.storage.path, parsed.storage.path);
        assert_eq!(config.log.format, parsed.log.format);
    }

    #[test]
    fn test_expand_tilde() {
        let storage = StorageConfig::default();
        let resolved = storage.resolved_path();
        assert!(!resolved.to_str().unwrap().starts_with("~/"));
        assert!(resolved.ends_with(".local/share/murmur/keys.json"));
    }
}
