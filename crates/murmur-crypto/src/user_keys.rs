//! Password-protected key bundle for a new user

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::encoding::{decode_base64, encode_base64, generate_salt, ByteInput};
use crate::error::CryptoResult;
use crate::kdf::{derive_key_from_password, DerivedKey, KdfParams};
use crate::keys::{generate_key_pair, unwrap_key, wrap_key, KeyPair, UnwrapError};

/// What gets stored for a user: the public key in the clear, the secret key
/// wrapped under a password-derived key, and the KDF salt. All base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserKeys {
    pub public_key: String,
    pub secret_key: String,
    pub salt: String,
}

/// Generate a key pair and wrap its secret half under `password`.
///
/// Runs the KDF once; callers on an async runtime should do this on a
/// blocking thread.
pub fn generate_user_keys(
    password: &SecretString,
    params: &KdfParams,
) -> CryptoResult<(UserKeys, KeyPair)> {
    let pair = generate_key_pair();
    let salt = generate_salt();
    let wrapping_key = derive_key_from_password(password, &ByteInput::from(salt), params)?;
    let wrapped = wrap_key(&wrapping_key, pair.secret_key())?;

    let bundle = UserKeys {
        public_key: pair.public_key_base64(),
        secret_key: encode_base64(&wrapped),
        salt: encode_base64(&salt),
    };
    Ok((bundle, pair))
}

impl UserKeys {
    /// Salt for re-deriving the wrapping key.
    pub fn salt(&self) -> ByteInput {
        ByteInput::from(&self.salt)
    }

    /// Recover the key pair with a wrapping key derived from the password.
    ///
    /// A secret key that does not reproduce the stored public key means the
    /// record was tampered with or mixed up, and is reported as malformed.
    pub fn unwrap_secret_key(&self, wrapping_key: &DerivedKey) -> Result<KeyPair, UnwrapError> {
        let wrapped = decode_base64(&self.secret_key)
            .map_err(|e| UnwrapError::Malformed(format!("wrapped secret key: {e}")))?;
        let secret = unwrap_key(wrapping_key, &wrapped)?;
        let pair = KeyPair::from_secret_key(*secret);

        if pair.public_key_base64() != self.public_key {
            return Err(UnwrapError::Malformed(
                "secret key does not match stored public key".into(),
            ));
        }
        Ok(pair)
    }
}
