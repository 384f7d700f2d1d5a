//! Key derivation: PBKDF2-HMAC-SHA256 password → wrapping key

use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::encoding::ByteInput;
use crate::error::{CryptoError, CryptoResult};
use crate::KEY_SIZE;

pub use murmur_core::config::MIN_KDF_ITERATIONS;

/// A 256-bit key derived from a password. Never persisted.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// PBKDF2 parameters. The iteration count can only be raised above
/// [`MIN_KDF_ITERATIONS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    iterations: u32,
}

impl KdfParams {
    pub fn new(iterations: u32) -> CryptoResult<Self> {
        if iterations < MIN_KDF_ITERATIONS {
            return Err(CryptoError::KeyDerivation(format!(
                "{iterations} PBKDF2 iterations is below the minimum of {MIN_KDF_ITERATIONS}"
            )));
        }
        Ok(Self { iterations })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: MIN_KDF_ITERATIONS,
        }
    }
}

/// Derive a 256-bit key from a password and salt using PBKDF2-HMAC-SHA256.
///
/// The salt may be raw bytes or base64. Identical inputs always produce the
/// identical key, so the key can be re-derived each session instead of stored.
///
/// This is deliberately slow. Async callers should run it on a blocking
/// thread (`tokio::task::spawn_blocking`).
pub fn derive_key_from_password(
    password: &SecretString,
    salt: &ByteInput,
    params: &KdfParams,
) -> CryptoResult<DerivedKey> {
    let salt = salt.to_bytes()?;
    if salt.is_empty() {
        return Err(CryptoError::KeyDerivation("salt must not be empty".into()));
    }

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2_hmac::<Sha256>(
        password.expose_secret().as_bytes(),
        &salt,
        params.iterations,
        &mut *key,
    );

    Ok(DerivedKey::from_bytes(*key))
}
