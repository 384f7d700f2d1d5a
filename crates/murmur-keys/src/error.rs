use murmur_crypto::CryptoError;
use thiserror::Error;

pub type KeyResult<T> = Result<T, KeyError>;

/// Failure to unlock the stored key pair.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// The password did not open the wrapped key. Recoverable: prompt again.
    #[error("wrong password")]
    WrongPassword,

    /// The stored record cannot be parsed or is internally inconsistent.
    #[error("stored keys are corrupted: {0}")]
    CorruptedKeyStore(String),
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key manager is not initialized for a user")]
    NotInitialized,

    #[error("no keys exist for this user")]
    NoKeys,

    #[error("keys are locked")]
    Locked,

    #[error("keys already exist for this user")]
    KeysExist,

    #[error("no public key available for recipient '{0}'")]
    MissingRecipientKey(String),

    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error("key storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("key directory error: {0}")]
    Directory(String),
}

impl From<std::io::Error> for KeyError {
    fn from(e: std::io::Error) -> Self {
        KeyError::Storage(e.to_string())
    }
}

impl From<keyring::Error> for KeyError {
    fn from(e: keyring::Error) -> Self {
        KeyError::Storage(format!("keychain: {e}"))
    }
}

impl From<reqwest::Error> for KeyError {
    fn from(e: reqwest::Error) -> Self {
        KeyError::Directory(e.to_string())
    }
}
