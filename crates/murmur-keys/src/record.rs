//! The persisted key record and its bookkeeping metadata

use murmur_core::now_millis;
use serde::{Deserialize, Serialize};

use crate::error::KeyResult;
use crate::store::{KeyStore, DEVICE_ID_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    #[default]
    Primary,
    Recovery,
    Device,
}

/// Bookkeeping stored next to the wrapped keys. Never secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMetadata {
    pub user_id: String,
    /// UUID v4 assigned when the pair was generated
    pub key_id: String,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub public_key_shared: bool,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub key_type: KeyType,
}

impl KeyMetadata {
    pub fn new(user_id: &str, device_id: &str) -> Self {
        let now = now_millis();
        Self {
            user_id: user_id.to_string(),
            key_id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            public_key_shared: false,
            device_id: device_id.to_string(),
            key_type: KeyType::Primary,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at);
    }
}

/// What lives under `keys:{userId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredKeys {
    /// X25519 public key, base64
    pub public_key: String,
    /// `[24-byte nonce][ciphertext + tag]`, base64
    pub wrapped_secret_key: String,
    /// PBKDF2 salt, base64
    pub salt: String,
    pub metadata: KeyMetadata,
}

/// This installation's device id, generated and persisted on first use.
pub fn device_id(store: &dyn KeyStore) -> KeyResult<String> {
    if let Some(id) = store.get(DEVICE_ID_KEY)? {
        return Ok(id);
    }
    let id = uuid::Uuid::new_v4().to_string();
    store.set(DEVICE_ID_KEY, &id)?;
    tracing::info!(device_id = %id, "generated device id");
    Ok(id)
}
