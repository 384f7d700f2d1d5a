//! Platform keychain backend for the key store.
//!
//! Uses the `keyring` crate for cross-platform access:
//! - macOS: Keychain Services
//! - Linux: kernel keyutils (lives for the login session; use the file
//!   backend for keys that must survive a reboot)
//! - Windows: Credential Manager (DPAPI)
//!
//! Without a platform backend `keyring` falls back to a per-entry mock that
//! forgets every write, so [`KeychainStore::is_available`] checks a real
//! write/read/delete before the store is handed out.

use crate::error::KeyResult;
use crate::store::KeyStore;

const DEFAULT_SERVICE: &str = "murmur";

/// Stores each entry as one keychain credential under a shared service name.
#[derive(Debug, Clone)]
pub struct KeychainStore {
    service: String,
}

impl KeychainStore {
    pub fn new() -> Self {
        Self::with_service(DEFAULT_SERVICE)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Check that a value written to the keychain can be read back.
    pub fn is_available(&self) -> bool {
        const CHECK_KEY: &str = "__murmur_check__";
        let written = self.set(CHECK_KEY, "ok").is_ok();
        let read_back = written && matches!(self.get(CHECK_KEY), Ok(Some(v)) if v == "ok");
        if written {
            let _ = self.remove(CHECK_KEY);
        }
        read_back
    }

    fn entry(&self, key: &str) -> KeyResult<keyring::Entry> {
        Ok(keyring::Entry::new(&self.service, key)?)
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for KeychainStore {
    fn get(&self, key: &str) -> KeyResult<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> KeyResult<()> {
        self.entry(key)?.set_password(value)?;
        tracing::debug!(key, service = %self.service, "stored entry in platform keychain");
        Ok(())
    }

    fn remove(&self, key: &str) -> KeyResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => {
                tracing::debug!(
                    key,
                    service = %self.service,
                    "deleted entry from platform keychain"
                );
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
