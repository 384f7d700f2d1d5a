//! Byte/string/base64 conversions and CSPRNG nonce/salt generation

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CryptoError, CryptoResult, DecodeError};
use crate::{NONCE_SIZE, SALT_SIZE};

/// 24 fresh bytes from the OS CSPRNG. Never derived from content.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// 16 fresh bytes from the OS CSPRNG.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    salt
}

pub fn string_to_bytes(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

pub fn bytes_to_string(bytes: &[u8]) -> Result<String, DecodeError> {
    Ok(String::from_utf8(bytes.to_vec())?)
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(STANDARD.decode(encoded)?)
}

/// Binary input that callers may hold either as raw bytes or as base64.
///
/// Normalized to bytes once, at the API boundary. Key material passes
/// through here, so the buffer is wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub enum ByteInput {
    Bytes(Vec<u8>),
    Base64(String),
}

impl ByteInput {
    /// Decode into raw bytes.
    pub fn to_bytes(&self) -> Result<Zeroizing<Vec<u8>>, DecodeError> {
        match self {
            ByteInput::Bytes(bytes) => Ok(Zeroizing::new(bytes.clone())),
            ByteInput::Base64(encoded) => Ok(Zeroizing::new(decode_base64(encoded)?)),
        }
    }

    /// Decode into a fixed-size array, failing on any other length.
    pub fn to_array<const N: usize>(&self) -> CryptoResult<Zeroizing<[u8; N]>> {
        let bytes = self.to_bytes()?;
        if bytes.len() != N {
            return Err(CryptoError::InvalidKeyLength {
                expected: N,
                actual: bytes.len(),
            });
        }
        let mut array = Zeroizing::new([0u8; N]);
        array.copy_from_slice(&bytes);
        Ok(array)
    }
}

impl std::fmt::Debug for ByteInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ByteInput::Bytes(bytes) => write!(f, "Bytes([REDACTED; {}])", bytes.len()),
            ByteInput::Base64(_) => f.write_str("Base64([REDACTED])"),
        }
    }
}

impl From<Vec<u8>> for ByteInput {
    fn from(bytes: Vec<u8>) -> Self {
        ByteInput::Bytes(bytes)
    }
}

impl From<&[u8]> for ByteInput {
    fn from(bytes: &[u8]) -> Self {
        ByteInput::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for ByteInput {
    fn from(bytes: [u8; N]) -> Self {
        ByteInput::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for ByteInput {
    fn from(bytes: &[u8; N]) -> Self {
        ByteInput::Bytes(bytes.to_vec())
    }
}

impl From<String> for ByteInput {
    fn from(encoded: String) -> Self {
        ByteInput::Base64(encoded)
    }
}

impl From<&str> for ByteInput {
    fn from(encoded: &str) -> Self {
        ByteInput::Base64(encoded.to_string())
    }
}

impl From<&String> for ByteInput {
    fn from(encoded: &String) -> Self {
        ByteInput::Base64(encoded.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_and_salt_sizes() {
        assert_eq!(generate_nonce().len(), 24);
        assert_eq!(generate_salt().len(), 16);
    }

    #[test]
    fn test_nonces_are_fresh() {
        assert_ne!(generate_nonce(), generate_nonce());
        assert_ne!(generate_salt(), generate_salt());
    }

    #[test]
    fn test_utf8_roundtrip() {
        for s in ["", "hello", "héllo wörld", "パスワード", "emoji 🔐🗝️", "\u{0}nul"] {
            assert_eq!(bytes_to_string(&string_to_bytes(s)).unwrap(), s);
        }
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let err = bytes_to_string(&[0xff, 0xfe, 0xfd]).unwrap_err();
        assert!(matches!(err, DecodeError::Utf8(_)));
    }

    #[test]
    fn test_base64_roundtrip() {
        assert_eq!(encode_base64(&[]), "");
        assert!(decode_base64("").unwrap().is_empty());

        let data = [0u8, 1, 2, 250, 255];
        assert_eq!(decode_base64(&encode_base64(&data)).unwrap(), data);
        assert_eq!(encode_base64(b"hello"), "aGVsbG8=");
    }

    #[test]
    fn test_malformed_base64_is_decode_error() {
        for bad in ["not base64!", "abc", "====", "aGVsbG8"] {
            let err = decode_base64(bad).unwrap_err();
            assert!(matches!(err, DecodeError::Base64(_)), "input {bad:?}");
        }
    }

    #[test]
    fn test_byte_input_normalizes_both_forms() {
        let raw = [7u8; 32];
        let from_bytes = ByteInput::from(raw);
        let from_b64 = ByteInput::from(encode_base64(&raw));

        assert_eq!(*from_bytes.to_array::<32>().unwrap(), raw);
        assert_eq!(*from_b64.to_array::<32>().unwrap(), raw);
    }

    #[test]
    fn test_byte_input_rejects_wrong_length() {
        let err = ByteInput::from(vec![1u8; 31]).to_array::<32>().unwrap_err();
        assert!(matches!(
            err,
            CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 31
            }
        ));
    }

    #[test]
    fn test_byte_input_debug_is_redacted() {
        let input = ByteInput::from("c2VjcmV0");
        assert!(!format!("{input:?}").contains("c2VjcmV0"));
    }
}
