//! murmur-crypto: end-to-end encryption for murmur direct messages
//!
//! Message encryption is NaCl `box` (X25519 + XSalsa20-Poly1305): the sender's
//! secret key and the recipient's public key give both parties the same shared
//! key, and the Poly1305 tag authenticates the sender.
//!
//! Key hierarchy:
//! ```text
//! Password + salt (16 bytes, stored in plaintext)
//!   └── Wrapping Key (256-bit, PBKDF2-HMAC-SHA256, >= 100k iterations, never stored)
//!       └── wraps the X25519 secret key: XChaCha20-Poly1305, [24-byte nonce][ct + tag]
//!           └── Message AEAD: box(plaintext, nonce=random_192bit, recipient_pk, sender_sk)
//! ```
//!
//! Every binary value that crosses the public API as data (ciphertexts,
//! nonces, public keys, salts) is standard base64.

pub mod asymmetric;
pub mod data;
pub mod encoding;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod message;
pub mod preferences;
pub mod symmetric;
pub mod user_keys;

pub use asymmetric::{decrypt_asymmetric, decrypt_asymmetric_json, encrypt_asymmetric};
pub use data::{EncryptedData, Payload};
pub use encoding::{
    bytes_to_string, decode_base64, encode_base64, generate_nonce, generate_salt,
    string_to_bytes, ByteInput,
};
pub use error::{CryptoError, CryptoResult, DecodeError};
pub use kdf::{derive_key_from_password, DerivedKey, KdfParams, MIN_KDF_ITERATIONS};
pub use keys::{generate_key_pair, unwrap_key, wrap_key, KeyPair, UnwrapError};
pub use message::{create_encrypted_message, decrypt_message, EncryptedMessage};
pub use preferences::{decrypt_preferences, encrypt_preferences};
pub use symmetric::{decrypt_symmetric, encrypt_symmetric};
pub use user_keys::{generate_user_keys, UserKeys};

/// Size of X25519 keys and symmetric keys in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XSalsa20 / XChaCha20 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a KDF salt (128-bit)
pub const SALT_SIZE: usize = 16;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;
