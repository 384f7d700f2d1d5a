use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Malformed caller input at the encoding boundary.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Errors raised by the crypto layer.
///
/// A ciphertext that fails authentication is not an error: decryption
/// functions return `Ok(None)` for that case.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("sender public key is required for decryption")]
    MissingKey,

    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
