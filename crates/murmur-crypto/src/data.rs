//! Plaintext payloads and the base64 ciphertext container

use serde::{Deserialize, Serialize};

use crate::error::CryptoResult;

/// Plaintext handed to an encrypt operation.
///
/// JSON values are serialized before encryption and come back as their JSON
/// text on decryption; callers parse them with `serde_json::from_str`.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(serde_json::Value),
}

impl Payload {
    /// Serialize any `Serialize` value as a JSON payload.
    pub fn json<T: Serialize>(value: &T) -> CryptoResult<Self> {
        Ok(Payload::Json(serde_json::to_value(value)?))
    }

    /// The exact string that gets encrypted.
    pub fn into_string(self) -> CryptoResult<String> {
        match self {
            Payload::Text(text) => Ok(text),
            Payload::Json(value) => Ok(serde_json::to_string(&value)?),
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&String> for Payload {
    fn from(text: &String) -> Self {
        Payload::Text(text.clone())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

/// Ciphertext plus everything except the key needed to open it.
///
/// All fields are standard base64. `public_key` is the sender's X25519 public
/// key for asymmetric data and absent for symmetric data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedData {
    pub ciphertext: String,
    pub nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}
