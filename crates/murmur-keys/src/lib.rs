//! murmur-keys: key lifecycle for an E2E messaging session
//!
//! Storage layout (one `KeyStore`, string values):
//!   - `keys:{userId}`                  wrapped key record (`StoredKeys`, JSON)
//!   - `contacts:{userId}:{otherUserId}` cached contact public key (base64)
//!   - `device:id`                      this installation's device id
//!
//! Backends: `MemoryStore` (tests), `FileStore` (JSON file), `KeychainStore`
//! (platform keychain via `keyring`).

pub mod directory;
pub mod error;
pub mod keychain;
pub mod manager;
pub mod record;
pub mod store;

pub use directory::{HttpKeyDirectory, PublicKeyDirectory};
pub use error::{AuthenticationError, KeyError, KeyResult};
pub use keychain::KeychainStore;
pub use manager::{KeyManager, KeyState};
pub use record::{device_id, KeyMetadata, KeyType, StoredKeys};
pub use store::{FileStore, KeyStore, MemoryStore};

use std::sync::Arc;

use murmur_core::config::{StorageBackend, StorageConfig};

/// Open the key store selected in config.
///
/// A keychain that cannot hold a value is an error, never a silent
/// in-process fallback.
pub fn open_store(config: &StorageConfig) -> KeyResult<Arc<dyn KeyStore>> {
    match config.backend {
        StorageBackend::File => {
            let path = config.resolved_path();
            tracing::debug!(path = %path.display(), "using file key store");
            Ok(Arc::new(FileStore::new(path)))
        }
        StorageBackend::Keychain => {
            let store = KeychainStore::new();
            if !store.is_available() {
                return Err(KeyError::Storage(
                    "platform keychain is not available; use the file backend".into(),
                ));
            }
            tracing::debug!("using platform keychain key store");
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            tracing::debug!("using in-memory key store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
