//! X25519 key pairs and password-key wrapping of the secret half

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use crypto_box::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use crate::encoding::{encode_base64, generate_nonce};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::DerivedKey;
use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

/// An X25519 key pair. The secret half is zeroized on drop.
#[derive(Clone)]
pub struct KeyPair {
    public_key: [u8; KEY_SIZE],
    secret_key: [u8; KEY_SIZE],
}

impl KeyPair {
    /// Rebuild a pair from its secret key; the public key is recomputed.
    pub fn from_secret_key(secret_key: [u8; KEY_SIZE]) -> Self {
        let secret = SecretKey::from(secret_key);
        let public_key = *secret.public_key().as_bytes();
        Self {
            public_key,
            secret_key,
        }
    }

    pub fn public_key(&self) -> &[u8; KEY_SIZE] {
        &self.public_key
    }

    pub fn secret_key(&self) -> &[u8; KEY_SIZE] {
        &self.secret_key
    }

    pub fn public_key_base64(&self) -> String {
        encode_base64(&self.public_key)
    }

    pub fn secret_key_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(encode_base64(&self.secret_key))
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.secret_key.zeroize();
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_base64())
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Generate a fresh X25519 key pair from the OS CSPRNG.
pub fn generate_key_pair() -> KeyPair {
    let secret = SecretKey::generate(&mut OsRng);
    let public: PublicKey = secret.public_key();
    KeyPair {
        public_key: *public.as_bytes(),
        secret_key: secret.to_bytes(),
    }
}

/// Why a wrapped secret key could not be recovered.
#[derive(Debug, Error)]
pub enum UnwrapError {
    /// The stored record is structurally broken.
    #[error("malformed wrapped key: {0}")]
    Malformed(String),

    /// AEAD authentication failed: wrong password or tampered record.
    #[error("wrapped key rejected")]
    Rejected,
}

/// Wrap (encrypt) a 32-byte secret key under a password-derived key.
///
/// Uses XChaCha20-Poly1305 with a random nonce.
/// Output: `[24-byte nonce][ciphertext + 16-byte tag]`
pub fn wrap_key(wrapping_key: &DerivedKey, secret_key: &[u8; KEY_SIZE]) -> CryptoResult<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(wrapping_key.as_bytes().into());

    let nonce_bytes = generate_nonce();
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, secret_key.as_slice())
        .map_err(|e| CryptoError::Encryption(format!("key wrapping failed: {e}")))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Unwrap (decrypt) a secret key wrapped by [`wrap_key`].
pub fn unwrap_key(
    wrapping_key: &DerivedKey,
    wrapped: &[u8],
) -> Result<Zeroizing<[u8; KEY_SIZE]>, UnwrapError> {
    let expected = NONCE_SIZE + KEY_SIZE + TAG_SIZE;
    if wrapped.len() != expected {
        return Err(UnwrapError::Malformed(format!(
            "wrapped key is {} bytes (expected {expected})",
            wrapped.len()
        )));
    }

    let (nonce_bytes, ciphertext) = wrapped.split_at(NONCE_SIZE);
    let nonce = XNonce::from_slice(nonce_bytes);
    let cipher = XChaCha20Poly1305::new(wrapping_key.as_bytes().into());

    let plaintext = Zeroizing::new(
        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| UnwrapError::Rejected)?,
    );

    if plaintext.len() != KEY_SIZE {
        return Err(UnwrapError::Malformed(format!(
            "unwrapped key has wrong size: {} bytes (expected {KEY_SIZE})",
            plaintext.len()
        )));
    }

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    key.copy_from_slice(&plaintext);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_wrapping_key() -> DerivedKey {
        DerivedKey::from_bytes([42u8; KEY_SIZE])
    }

    #[test]
    fn test_key_pair_generation() {
        let k1 = generate_key_pair();
        let k2 = generate_key_pair();
        assert_ne!(k1.public_key(), k2.public_key(), "random keys must differ");
        assert_ne!(k1.secret_key(), k2.secret_key());
        assert_eq!(k1.public_key_base64().len(), 44);
    }

    #[test]
    fn test_public_key_recomputed_from_secret() {
        let pair = generate_key_pair();
        let rebuilt = KeyPair::from_secret_key(*pair.secret_key());
        assert_eq!(rebuilt.public_key(), pair.public_key());
    }

    #[test]
    fn test_key_wrap_unwrap_roundtrip() {
        let wrapping = test_wrapping_key();
        let pair = generate_key_pair();

        let wrapped = wrap_key(&wrapping, pair.secret_key()).unwrap();
        assert_eq!(wrapped.len(), NONCE_SIZE + KEY_SIZE + TAG_SIZE);

        let unwrapped = unwrap_key(&wrapping, &wrapped).unwrap();
        assert_eq!(&*unwrapped, pair.secret_key());
    }

    #[test]
    fn test_unwrap_wrong_key_is_rejected() {
        let pair = generate_key_pair();
        let wrapped = wrap_key(&test_wrapping_key(), pair.secret_key()).unwrap();

        let wrong = DerivedKey::from_bytes([99u8; KEY_SIZE]);
        assert!(matches!(
            unwrap_key(&wrong, &wrapped),
            Err(UnwrapError::Rejected)
        ));
    }

    #[test]
    fn test_unwrap_tampered_is_rejected() {
        let wrapping = test_wrapping_key();
        let pair = generate_key_pair();
        let mut wrapped = wrap_key(&wrapping, pair.secret_key()).unwrap();
        wrapped[NONCE_SIZE + 3] ^= 0x01;

        assert!(matches!(
            unwrap_key(&wrapping, &wrapped),
            Err(UnwrapError::Rejected)
        ));
    }

    #[test]
    fn test_unwrap_truncated_is_malformed() {
        let wrapping = test_wrapping_key();
        let wrapped = wrap_key(&wrapping, &[1u8; KEY_SIZE]).unwrap();

        assert!(matches!(
            unwrap_key(&wrapping, &wrapped[..20]),
            Err(UnwrapError::Malformed(_))
        ));
        assert!(matches!(
            unwrap_key(&wrapping, &[]),
            Err(UnwrapError::Malformed(_))
        ));
    }

    #[test]
    fn test_key_pair_debug_hides_secret() {
        let pair = generate_key_pair();
        let rendered = format!("{pair:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains(pair.secret_key_base64().as_str()));
    }
}
