//! Session key manager.
//!
//! One `KeyManager` per signed-in session. It owns the lifecycle of the
//! user's key pair:
//!
//! ```text
//! Uninitialized ──initialize(user)──▶ NoKeys ──generate_and_persist_keys──▶ Locked
//!                                                                            │  ▲
//!                           set_encryption_key_from_password(password) ──────┘  │ clear()
//!                                                                               │
//!                                                                           Unlocked
//! ```
//!
//! Only the wrapped secret key is ever persisted. The unwrapped key pair and
//! the password-derived key live in memory while Unlocked and are zeroized
//! on `clear()`.

use std::sync::Arc;

use murmur_core::{MessageMetadata, UserPreferences};
use murmur_crypto::{
    create_encrypted_message, decrypt_message, derive_key_from_password, generate_user_keys,
    ByteInput, CryptoError, DerivedKey, EncryptedData, EncryptedMessage, KdfParams, KeyPair,
    Payload, UnwrapError, UserKeys, KEY_SIZE,
};
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::directory::PublicKeyDirectory;
use crate::error::{AuthenticationError, KeyError, KeyResult};
use crate::record::{device_id, KeyMetadata, StoredKeys};
use crate::store::{contact_key, keys_key, KeyStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Uninitialized,
    NoKeys,
    Locked,
    Unlocked,
}

impl std::fmt::Display for KeyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            KeyState::Uninitialized => "uninitialized",
            KeyState::NoKeys => "no-keys",
            KeyState::Locked => "locked",
            KeyState::Unlocked => "unlocked",
        })
    }
}

enum Record {
    Missing,
    Present(StoredKeys),
    /// A value exists under `keys:{userId}` but does not parse.
    Corrupted(String),
}

struct Unlocked {
    keys: KeyPair,
    encryption_key: DerivedKey,
}

struct Session {
    user_id: Option<String>,
    record: Record,
    unlocked: Option<Unlocked>,
    /// Bumped by `initialize` and `clear`. A KDF run that started under an
    /// older epoch must not install its result.
    epoch: u64,
}

impl Session {
    fn state(&self) -> KeyState {
        match (&self.user_id, &self.record, &self.unlocked) {
            (None, _, _) => KeyState::Uninitialized,
            (Some(_), Record::Missing, _) => KeyState::NoKeys,
            (Some(_), _, None) => KeyState::Locked,
            (Some(_), _, Some(_)) => KeyState::Unlocked,
        }
    }

    fn user_id(&self) -> KeyResult<&str> {
        self.user_id.as_deref().ok_or(KeyError::NotInitialized)
    }

    fn unlocked(&self) -> KeyResult<&Unlocked> {
        match self.state() {
            KeyState::Uninitialized => Err(KeyError::NotInitialized),
            KeyState::NoKeys => Err(KeyError::NoKeys),
            KeyState::Locked => Err(KeyError::Locked),
            KeyState::Unlocked => self.unlocked.as_ref().ok_or(KeyError::Locked),
        }
    }
}

pub struct KeyManager {
    store: Arc<dyn KeyStore>,
    params: KdfParams,
    session: RwLock<Session>,
}

fn copy_secret(password: &SecretString) -> SecretString {
    SecretString::from(password.expose_secret().to_owned())
}

fn corrupted(reason: impl Into<String>) -> KeyError {
    KeyError::Authentication(AuthenticationError::CorruptedKeyStore(reason.into()))
}

/// Run the KDF on tokio's blocking pool.
async fn derive_off_thread(
    password: SecretString,
    salt: ByteInput,
    params: KdfParams,
) -> KeyResult<DerivedKey> {
    tokio::task::spawn_blocking(move || derive_key_from_password(&password, &salt, &params))
        .await
        .map_err(|e| CryptoError::KeyDerivation(format!("KDF task failed: {e}")))?
        .map_err(KeyError::from)
}

impl KeyManager {
    pub fn new(store: Arc<dyn KeyStore>, params: KdfParams) -> Self {
        Self {
            store,
            params,
            session: RwLock::new(Session {
                user_id: None,
                record: Record::Missing,
                unlocked: None,
                epoch: 0,
            }),
        }
    }

    pub fn state(&self) -> KeyState {
        self.session.read().state()
    }

    pub fn user_id(&self) -> Option<String> {
        self.session.read().user_id.clone()
    }

    /// Bind to `user_id` and load their stored record, if any.
    ///
    /// Any previous session, including an unlocked one for another user, is
    /// wiped first.
    pub fn initialize(&self, user_id: &str) -> KeyResult<()> {
        let raw = self.store.get(&keys_key(user_id))?;
        let record = match raw {
            None => Record::Missing,
            Some(raw) => match serde_json::from_str::<StoredKeys>(&raw) {
                Ok(stored) => Record::Present(stored),
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        error = %e,
                        "stored key record does not parse"
                    );
                    Record::Corrupted(format!("key record is not valid JSON: {e}"))
                }
            },
        };

        let mut session = self.session.write();
        session.unlocked = None;
        session.epoch += 1;
        session.user_id = Some(user_id.to_string());
        session.record = record;
        tracing::info!(user_id = %user_id, state = %session.state(), "key manager initialized");
        Ok(())
    }

    /// True iff a key record exists for the bound user, locked or not.
    pub fn has_keys(&self) -> bool {
        let session = self.session.read();
        session.user_id.is_some() && !matches!(session.record, Record::Missing)
    }

    /// Generate a key pair, wrap it under `password`, and persist it.
    ///
    /// Leaves the manager Locked. Existing keys are never overwritten.
    pub async fn generate_and_persist_keys(&self, password: &SecretString) -> KeyResult<KeyPair> {
        let user_id = {
            let session = self.session.read();
            let user_id = session.user_id()?.to_string();
            if !matches!(session.record, Record::Missing) {
                return Err(KeyError::KeysExist);
            }
            user_id
        };

        let password = copy_secret(password);
        let params = self.params;
        let (bundle, pair) =
            tokio::task::spawn_blocking(move || generate_user_keys(&password, &params))
                .await
                .map_err(|e| CryptoError::KeyDerivation(format!("KDF task failed: {e}")))??;

        let device = device_id(self.store.as_ref())?;
        let mut session = self.session.write();
        if session.user_id.as_deref() != Some(user_id.as_str()) {
            tracing::warn!(
                user_id = %user_id,
                "session rebound during key generation; discarding keys"
            );
            return Err(KeyError::NotInitialized);
        }
        if !matches!(session.record, Record::Missing) {
            return Err(KeyError::KeysExist);
        }

        let stored = StoredKeys {
            public_key: bundle.public_key,
            wrapped_secret_key: bundle.secret_key,
            salt: bundle.salt,
            metadata: KeyMetadata::new(&user_id, &device),
        };
        let json = serde_json::to_string(&stored).map_err(CryptoError::from)?;
        self.store.set(&keys_key(&user_id), &json)?;
        tracing::info!(
            user_id = %user_id,
            key_id = %stored.metadata.key_id,
            "generated and stored key pair"
        );
        session.record = Record::Present(stored);
        Ok(pair)
    }

    /// Unlock the stored key pair with `password`.
    ///
    /// The KDF runs on a blocking thread. If `clear()` or `initialize()` runs
    /// while it is in flight, the result is dropped and this returns
    /// [`KeyError::Locked`].
    pub async fn set_encryption_key_from_password(&self, password: &SecretString) -> KeyResult<()> {
        let (user_id, stored, epoch) = {
            let session = self.session.read();
            let user_id = session.user_id()?.to_string();
            let stored = match &session.record {
                Record::Missing => return Err(KeyError::NoKeys),
                Record::Corrupted(reason) => return Err(corrupted(reason.clone())),
                Record::Present(stored) => stored.clone(),
            };
            (user_id, stored, session.epoch)
        };

        let bundle = UserKeys {
            public_key: stored.public_key,
            secret_key: stored.wrapped_secret_key,
            salt: stored.salt,
        };
        let salt = bundle.salt();
        match salt.to_bytes() {
            Ok(bytes) if !bytes.is_empty() => {}
            Ok(_) => return Err(corrupted("salt is empty")),
            Err(e) => return Err(corrupted(format!("salt: {e}"))),
        }
        let encryption_key = derive_off_thread(copy_secret(password), salt, self.params).await?;

        let keys = match bundle.unwrap_secret_key(&encryption_key) {
            Ok(keys) => keys,
            Err(UnwrapError::Rejected) => {
                tracing::warn!(user_id = %user_id, "unlock failed: wrong password");
                return Err(AuthenticationError::WrongPassword.into());
            }
            Err(UnwrapError::Malformed(reason)) => {
                tracing::warn!(
                    user_id = %user_id,
                    %reason,
                    "unlock failed: key record is corrupted"
                );
                return Err(corrupted(reason));
            }
        };

        let mut session = self.session.write();
        if session.epoch != epoch {
            tracing::info!(user_id = %user_id, "session cleared during unlock; discarding keys");
            return Err(KeyError::Locked);
        }
        session.unlocked = Some(Unlocked {
            keys,
            encryption_key,
        });
        tracing::info!(user_id = %user_id, "keys unlocked");
        Ok(())
    }

    pub fn get_keys(&self) -> Option<KeyPair> {
        let session = self.session.read();
        session.unlocked().ok().map(|u| u.keys.clone())
    }

    pub fn get_secret_key(&self) -> Option<Zeroizing<[u8; KEY_SIZE]>> {
        let session = self.session.read();
        session
            .unlocked()
            .ok()
            .map(|u| Zeroizing::new(*u.keys.secret_key()))
    }

    pub fn get_encryption_key(&self) -> Option<DerivedKey> {
        let session = self.session.read();
        session.unlocked().ok().map(|u| u.encryption_key.clone())
    }

    /// The bound user's public key, available whenever a record is loaded.
    pub fn get_public_key(&self) -> Option<String> {
        match &self.session.read().record {
            Record::Present(stored) => Some(stored.public_key.clone()),
            _ => None,
        }
    }

    pub fn metadata(&self) -> Option<KeyMetadata> {
        match &self.session.read().record {
            Record::Present(stored) => Some(stored.metadata.clone()),
            _ => None,
        }
    }

    /// Record that the public key has been published to the server.
    pub fn mark_public_key_shared(&self) -> KeyResult<()> {
        let mut session = self.session.write();
        let user_id = session.user_id()?.to_string();
        let Record::Present(stored) = &mut session.record else {
            return Err(KeyError::NoKeys);
        };
        let mut updated = stored.clone();
        updated.metadata.public_key_shared = true;
        updated.metadata.touch();

        let json = serde_json::to_string(&updated).map_err(CryptoError::from)?;
        self.store.set(&keys_key(&user_id), &json)?;
        *stored = updated;
        tracing::debug!(user_id = %user_id, "public key marked as shared");
        Ok(())
    }

    /// Cache a contact's public key. The key must decode to 32 bytes.
    pub fn store_public_key_for_user(
        &self,
        other_user_id: &str,
        public_key: &str,
    ) -> KeyResult<()> {
        ByteInput::from(public_key).to_array::<KEY_SIZE>()?;
        let user_id = self.session.read().user_id()?.to_string();
        self.store
            .set(&contact_key(&user_id, other_user_id), public_key)?;
        tracing::debug!(user_id = %user_id, contact = other_user_id, "cached contact public key");
        Ok(())
    }

    /// Cached public key for a contact. `Ok(None)` before [`initialize`](Self::initialize).
    pub fn get_public_key_for_user(&self, other_user_id: &str) -> KeyResult<Option<String>> {
        match self.user_id() {
            Some(user_id) => self.store.get(&contact_key(&user_id, other_user_id)),
            None => Ok(None),
        }
    }

    /// Contact key from the cache, falling back to `directory` on a miss.
    pub async fn resolve_public_key(
        &self,
        other_user_id: &str,
        directory: &dyn PublicKeyDirectory,
    ) -> KeyResult<String> {
        self.session.read().user_id()?;
        if let Some(cached) = self.get_public_key_for_user(other_user_id)? {
            return Ok(cached);
        }
        let fetched = directory.fetch_public_key(other_user_id).await?;
        self.store_public_key_for_user(other_user_id, &fetched)?;
        Ok(fetched)
    }

    /// Encrypt a message to a contact whose key is already cached.
    ///
    /// Refuses with [`KeyError::MissingRecipientKey`] rather than sending
    /// anything unencrypted.
    pub fn encrypt_message_for(
        &self,
        recipient_id: &str,
        plaintext: impl Into<Payload>,
        metadata: Option<MessageMetadata>,
    ) -> KeyResult<EncryptedMessage> {
        self.session.read().unlocked()?;
        let recipient_key = self
            .get_public_key_for_user(recipient_id)?
            .ok_or_else(|| KeyError::MissingRecipientKey(recipient_id.to_string()))?;

        let session = self.session.read();
        let unlocked = session.unlocked()?;
        let sender_id = session.user_id()?;
        Ok(create_encrypted_message(
            plaintext,
            &unlocked.keys,
            &ByteInput::from(recipient_key),
            sender_id,
            recipient_id,
            metadata,
        )?)
    }

    /// Open a message addressed to the bound user. `Ok(None)` if it does
    /// not authenticate.
    pub fn decrypt_incoming(&self, message: &EncryptedMessage) -> KeyResult<Option<String>> {
        let session = self.session.read();
        let unlocked = session.unlocked()?;
        Ok(decrypt_message(
            message,
            &ByteInput::from(unlocked.keys.secret_key()),
        )?)
    }

    pub fn encrypt_preferences(&self, preferences: &UserPreferences) -> KeyResult<EncryptedData> {
        let session = self.session.read();
        let unlocked = session.unlocked()?;
        Ok(murmur_crypto::encrypt_preferences(
            preferences,
            &ByteInput::from(unlocked.encryption_key.as_bytes()),
        )?)
    }

    pub fn decrypt_preferences(&self, data: &EncryptedData) -> KeyResult<Option<UserPreferences>> {
        let session = self.session.read();
        let unlocked = session.unlocked()?;
        Ok(murmur_crypto::decrypt_preferences(
            data,
            &ByteInput::from(unlocked.encryption_key.as_bytes()),
        )?)
    }

    /// Drop the in-memory key pair and derived key. The stored record stays.
    pub fn clear(&self) {
        let mut session = self.session.write();
        session.unlocked = None;
        session.epoch += 1;
        tracing::info!(user_id = ?session.user_id, "session keys cleared");
    }

    /// Clear the session and delete the stored record for the bound user.
    ///
    /// Messages encrypted to the old key can no longer be read.
    pub fn reset(&self) -> KeyResult<()> {
        let mut session = self.session.write();
        let user_id = session.user_id()?.to_string();
        self.store.remove(&keys_key(&user_id))?;
        session.unlocked = None;
        session.epoch += 1;
        session.record = Record::Missing;
        tracing::warn!(user_id = %user_id, "encryption keys reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn manager() -> (Arc<MemoryStore>, KeyManager) {
        let store = Arc::new(MemoryStore::new());
        let manager = KeyManager::new(store.clone(), KdfParams::default());
        (store, manager)
    }

    #[test]
    fn test_starts_uninitialized() {
        let (_, km) = manager();
        assert_eq!(km.state(), KeyState::Uninitialized);
        assert!(!km.has_keys());
        assert!(km.get_keys().is_none());
        assert!(km.get_public_key().is_none());
        assert!(km.metadata().is_none());
        assert_eq!(km.get_public_key_for_user("bob").unwrap(), None);
        assert!(matches!(
            km.store_public_key_for_user("bob", &murmur_crypto::encode_base64(&[7u8; 32])),
            Err(KeyError::NotInitialized)
        ));
        assert!(matches!(km.reset(), Err(KeyError::NotInitialized)));
    }

    #[test]
    fn test_initialize_without_record_is_no_keys() {
        let (_, km) = manager();
        km.initialize("alice").unwrap();
        assert_eq!(km.state(), KeyState::NoKeys);
        assert_eq!(km.user_id().as_deref(), Some("alice"));
        assert!(matches!(km.mark_public_key_shared(), Err(KeyError::NoKeys)));
    }

    #[tokio::test]
    async fn test_generate_requires_initialize() {
        let (_, km) = manager();
        let result = km
            .generate_and_persist_keys(&SecretString::from("pw"))
            .await;
        assert!(matches!(result, Err(KeyError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_unlock_without_keys() {
        let (_, km) = manager();
        km.initialize("alice").unwrap();
        let result = km
            .set_encryption_key_from_password(&SecretString::from("pw"))
            .await;
        assert!(matches!(result, Err(KeyError::NoKeys)));
    }

    #[tokio::test]
    async fn test_unparsable_record_is_corrupted() {
        let (store, km) = manager();
        store.set(&keys_key("alice"), "{not json").unwrap();
        km.initialize("alice").unwrap();

        assert!(km.has_keys());
        assert_eq!(km.state(), KeyState::Locked);
        assert!(km.get_public_key().is_none());

        let result = km
            .set_encryption_key_from_password(&SecretString::from("pw"))
            .await;
        assert!(matches!(
            result,
            Err(KeyError::Authentication(AuthenticationError::CorruptedKeyStore(_)))
        ));
    }

    #[test]
    fn test_contact_key_must_be_32_bytes() {
        let (_, km) = manager();
        km.initialize("alice").unwrap();

        let short = murmur_crypto::encode_base64(&[1u8; 16]);
        assert!(matches!(
            km.store_public_key_for_user("bob", &short),
            Err(KeyError::Crypto(CryptoError::InvalidKeyLength { .. }))
        ));
        assert!(matches!(
            km.store_public_key_for_user("bob", "%%%"),
            Err(KeyError::Crypto(CryptoError::Decode(_)))
        ));
        assert_eq!(km.get_public_key_for_user("bob").unwrap(), None);
    }

    #[test]
    fn test_send_without_recipient_key_refuses() {
        let (_, km) = manager();
        km.initialize("alice").unwrap();
        assert!(matches!(
            km.encrypt_message_for("bob", "hi", None),
            Err(KeyError::MissingRecipientKey(id)) if id == "bob"
        ));
    }

    #[test]
    fn test_key_state_display() {
        assert_eq!(KeyState::NoKeys.to_string(), "no-keys");
        assert_eq!(KeyState::Unlocked.to_string(), "unlocked");
    }
}
