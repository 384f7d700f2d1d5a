//! Authenticated public-key encryption (NaCl box)
//!
//! The sender's secret key and the recipient's public key produce the same
//! shared key as the recipient's secret key and the sender's public key, so
//! a ciphertext that opens is proof the sender's secret key produced it.

use crypto_box::aead::Aead;
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use serde::de::DeserializeOwned;
use zeroize::Zeroizing;

use crate::data::{EncryptedData, Payload};
use crate::encoding::{bytes_to_string, decode_base64, encode_base64, generate_nonce, ByteInput};
use crate::error::{CryptoError, CryptoResult};
use crate::{KEY_SIZE, NONCE_SIZE};

/// Encrypt a payload for one recipient.
///
/// A fresh nonce is drawn for every call. The returned data carries the
/// sender's public key (derived from `sender_secret_key`) so the recipient
/// can open it without a separate lookup.
pub fn encrypt_asymmetric(
    plaintext: impl Into<Payload>,
    recipient_public_key: &ByteInput,
    sender_secret_key: &ByteInput,
) -> CryptoResult<EncryptedData> {
    let recipient = PublicKey::from(*recipient_public_key.to_array::<KEY_SIZE>()?);
    let sender = SecretKey::from(*sender_secret_key.to_array::<KEY_SIZE>()?);
    let plaintext = Zeroizing::new(plaintext.into().into_string()?);

    let nonce_bytes = generate_nonce();
    let salsa_box = SalsaBox::new(&recipient, &sender);
    let ciphertext = salsa_box
        .encrypt(crypto_box::Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("box encryption failed: {e}")))?;

    Ok(EncryptedData {
        ciphertext: encode_base64(&ciphertext),
        nonce: encode_base64(&nonce_bytes),
        public_key: Some(encode_base64(sender.public_key().as_bytes())),
    })
}

/// Decrypt data produced by [`encrypt_asymmetric`].
///
/// The sender key embedded in `data` wins over `sender_public_key`; with
/// neither present this is [`CryptoError::MissingKey`].
///
/// Returns `Ok(None)` when the data does not authenticate under the given
/// keys, including a nonce or embedded key of the wrong length. A caller
/// supplied key of the wrong length is [`CryptoError::InvalidKeyLength`].
pub fn decrypt_asymmetric(
    data: &EncryptedData,
    recipient_secret_key: &ByteInput,
    sender_public_key: Option<&ByteInput>,
) -> CryptoResult<Option<String>> {
    let sender_bytes = match (&data.public_key, sender_public_key) {
        (Some(embedded), _) => decode_base64(embedded)?,
        (None, Some(given)) => given.to_array::<KEY_SIZE>()?.to_vec(),
        (None, None) => return Err(CryptoError::MissingKey),
    };
    let recipient = SecretKey::from(*recipient_secret_key.to_array::<KEY_SIZE>()?);
    let ciphertext = decode_base64(&data.ciphertext)?;
    let nonce_bytes = decode_base64(&data.nonce)?;

    let Ok(sender_bytes) = <[u8; KEY_SIZE]>::try_from(sender_bytes.as_slice()) else {
        tracing::debug!(len = sender_bytes.len(), "sender public key has wrong length");
        return Ok(None);
    };
    if nonce_bytes.len() != NONCE_SIZE {
        tracing::debug!(len = nonce_bytes.len(), "box nonce has wrong length");
        return Ok(None);
    }

    let salsa_box = SalsaBox::new(&PublicKey::from(sender_bytes), &recipient);
    let plaintext = match salsa_box.decrypt(
        crypto_box::Nonce::from_slice(&nonce_bytes),
        ciphertext.as_slice(),
    ) {
        Ok(plaintext) => Zeroizing::new(plaintext),
        Err(_) => {
            tracing::debug!("box ciphertext rejected");
            return Ok(None);
        }
    };

    Ok(Some(bytes_to_string(&plaintext)?))
}

/// [`decrypt_asymmetric`] followed by a JSON parse into `T`.
///
/// A plaintext that authenticates but does not parse as `T` is an error.
pub fn decrypt_asymmetric_json<T: DeserializeOwned>(
    data: &EncryptedData,
    recipient_secret_key: &ByteInput,
    sender_public_key: Option<&ByteInput>,
) -> CryptoResult<Option<T>> {
    match decrypt_asymmetric(data, recipient_secret_key, sender_public_key)? {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}
