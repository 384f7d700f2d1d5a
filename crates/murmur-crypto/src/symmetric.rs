//! Secret-key encryption for data the user keeps for themselves

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use zeroize::Zeroizing;

use crate::data::{EncryptedData, Payload};
use crate::encoding::{bytes_to_string, decode_base64, encode_base64, generate_nonce, ByteInput};
use crate::error::{CryptoError, CryptoResult};
use crate::{KEY_SIZE, NONCE_SIZE};

/// Encrypt a payload under a 32-byte symmetric key (XChaCha20-Poly1305).
///
/// The result carries no public key.
pub fn encrypt_symmetric(
    plaintext: impl Into<Payload>,
    key: &ByteInput,
) -> CryptoResult<EncryptedData> {
    let key = key.to_array::<KEY_SIZE>()?;
    let plaintext = Zeroizing::new(plaintext.into().into_string()?);

    let cipher = XChaCha20Poly1305::new((&*key).into());
    let nonce_bytes = generate_nonce();
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce_bytes), plaintext.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("symmetric encryption failed: {e}")))?;

    Ok(EncryptedData {
        ciphertext: encode_base64(&ciphertext),
        nonce: encode_base64(&nonce_bytes),
        public_key: None,
    })
}

/// Decrypt data produced by [`encrypt_symmetric`].
///
/// Returns `Ok(None)` when the nonce has the wrong length or the ciphertext
/// fails authentication.
pub fn decrypt_symmetric(data: &EncryptedData, key: &ByteInput) -> CryptoResult<Option<String>> {
    let key = key.to_array::<KEY_SIZE>()?;
    let ciphertext = decode_base64(&data.ciphertext)?;
    let nonce_bytes = decode_base64(&data.nonce)?;

    if nonce_bytes.len() != NONCE_SIZE {
        tracing::debug!(len = nonce_bytes.len(), "symmetric nonce has wrong length");
        return Ok(None);
    }

    let cipher = XChaCha20Poly1305::new((&*key).into());
    let plaintext = match cipher.decrypt(XNonce::from_slice(&nonce_bytes), ciphertext.as_slice()) {
        Ok(plaintext) => Zeroizing::new(plaintext),
        Err(_) => {
            tracing::debug!("symmetric ciphertext rejected");
            return Ok(None);
        }
    };

    Ok(Some(bytes_to_string(&plaintext)?))
}
