//! Preferences encrypted under the user's own symmetric key

use murmur_core::{is_valid_user_preferences, UserPreferences};

use crate::data::{EncryptedData, Payload};
use crate::encoding::ByteInput;
use crate::error::{CryptoError, CryptoResult};
use crate::symmetric::{decrypt_symmetric, encrypt_symmetric};

/// Validate and encrypt a preferences document.
pub fn encrypt_preferences(
    preferences: &UserPreferences,
    key: &ByteInput,
) -> CryptoResult<EncryptedData> {
    preferences
        .validate()
        .map_err(CryptoError::InvalidMetadata)?;
    encrypt_symmetric(Payload::json(preferences)?, key)
}

/// Decrypt a preferences document.
///
/// `Ok(None)` when the ciphertext is rejected or the plaintext is not a
/// structurally valid preferences object.
pub fn decrypt_preferences(
    data: &EncryptedData,
    key: &ByteInput,
) -> CryptoResult<Option<UserPreferences>> {
    let Some(text) = decrypt_symmetric(data, key)? else {
        return Ok(None);
    };

    let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) else {
        tracing::debug!("decrypted preferences are not JSON");
        return Ok(None);
    };
    if !is_valid_user_preferences(&value) {
        tracing::debug!("decrypted preferences failed validation");
        return Ok(None);
    }

    Ok(serde_json::from_value(value).ok())
}
