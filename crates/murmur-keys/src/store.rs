//! Key-value persistence for wrapped keys, contact keys and the device id.
//!
//! Values are opaque strings (JSON or base64). Nothing stored here is
//! plaintext secret material: the secret key is always wrapped first.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};

use crate::error::{KeyError, KeyResult};

/// Storage key for a user's wrapped key record.
pub fn keys_key(user_id: &str) -> String {
    format!("keys:{user_id}")
}

/// Storage key for a cached contact public key, scoped to the owning user.
pub fn contact_key(user_id: &str, other_user_id: &str) -> String {
    format!("contacts:{user_id}:{other_user_id}")
}

/// Storage key for this installation's device id.
pub const DEVICE_ID_KEY: &str = "device:id";

pub trait KeyStore: Send + Sync {
    fn get(&self, key: &str) -> KeyResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> KeyResult<()>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> KeyResult<()>;
}

/// Volatile store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyStore for MemoryStore {
    fn get(&self, key: &str) -> KeyResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> KeyResult<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> KeyResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// A JSON object on disk, rewritten in full on every change.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a crash never leaves a half-written store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> KeyResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            KeyError::Storage(format!("reading key store {}: {e}", self.path.display()))
        })?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            KeyError::Storage(format!("parsing key store {}: {e}", self.path.display()))
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> KeyResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    KeyError::Storage(format!("creating dir {}: {e}", parent.display()))
                })?;
            }
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| KeyError::Storage(format!("serializing key store: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| KeyError::Storage(format!("writing {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            KeyError::Storage(format!("replacing key store {}: {e}", self.path.display()))
        })?;
        Ok(())
    }
}

impl KeyStore for FileStore {
    fn get(&self, key: &str) -> KeyResult<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> KeyResult<()> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)?;
        tracing::debug!(key, path = %self.path.display(), "key store entry written");
        Ok(())
    }

    fn remove(&self, key: &str) -> KeyResult<()> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
            tracing::debug!(key, path = %self.path.display(), "key store entry removed");
        }
        Ok(())
    }
}
