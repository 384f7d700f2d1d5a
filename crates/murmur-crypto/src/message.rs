//! Message envelopes: an asymmetric ciphertext plus plaintext routing fields

use murmur_core::{now_millis, MessageMetadata};
use serde::{Deserialize, Serialize};

use crate::asymmetric::{decrypt_asymmetric, encrypt_asymmetric};
use crate::data::{EncryptedData, Payload};
use crate::encoding::ByteInput;
use crate::error::{CryptoError, CryptoResult};
use crate::keys::KeyPair;

/// An encrypted direct message as it travels through the server.
///
/// Only the payload is encrypted. `sender`, `recipient`, `timestamp` and
/// `metadata` stay readable so the server can route and order messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedMessage {
    #[serde(flatten)]
    pub data: EncryptedData,
    pub sender: String,
    pub recipient: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl EncryptedMessage {
    /// Sender public key carried in the envelope, base64.
    pub fn public_key(&self) -> Option<&str> {
        self.data.public_key.as_deref()
    }
}

/// Encrypt `plaintext` from `sender_keys` to `recipient_public_key` and wrap
/// it in an envelope.
///
/// Metadata is validated before anything is encrypted.
pub fn create_encrypted_message(
    plaintext: impl Into<Payload>,
    sender_keys: &KeyPair,
    recipient_public_key: &ByteInput,
    sender_id: &str,
    recipient_id: &str,
    metadata: Option<MessageMetadata>,
) -> CryptoResult<EncryptedMessage> {
    if let Some(metadata) = &metadata {
        metadata.validate().map_err(CryptoError::InvalidMetadata)?;
    }

    let data = encrypt_asymmetric(
        plaintext,
        recipient_public_key,
        &ByteInput::from(sender_keys.secret_key()),
    )?;

    Ok(EncryptedMessage {
        data,
        sender: sender_id.to_string(),
        recipient: recipient_id.to_string(),
        timestamp: now_millis(),
        metadata,
    })
}

/// Open an envelope with the recipient's secret key.
///
/// The sender key comes from the envelope itself. `Ok(None)` when the message
/// does not authenticate.
pub fn decrypt_message(
    message: &EncryptedMessage,
    recipient_secret_key: &ByteInput,
) -> CryptoResult<Option<String>> {
    decrypt_asymmetric(&message.data, recipient_secret_key, None)
}
