//! End-to-end message flow between three users.
//!
//! A and B exchange messages through JSON (as a server would relay them);
//! C, holding only its own keys, must not be able to read either direction.

use murmur_core::MessageMetadata;
use murmur_crypto::{
    create_encrypted_message, decrypt_asymmetric_json, decrypt_message, encrypt_asymmetric,
    generate_key_pair, ByteInput, EncryptedMessage, KeyPair,
};
use serde_json::json;

fn relay(message: &EncryptedMessage) -> EncryptedMessage {
    let wire = serde_json::to_string(message).unwrap();
    serde_json::from_str(&wire).unwrap()
}

fn secret(pair: &KeyPair) -> ByteInput {
    ByteInput::from(pair.secret_key())
}

fn public(pair: &KeyPair) -> ByteInput {
    ByteInput::from(pair.public_key_base64())
}

#[test]
fn three_party_exchange() {
    let a = generate_key_pair();
    let b = generate_key_pair();
    let c = generate_key_pair();

    let to_b = create_encrypted_message(
        "Hi B, it's A",
        &a,
        &public(&b),
        "user-a",
        "user-b",
        Some(MessageMetadata::new("text")),
    )
    .unwrap();
    let received = relay(&to_b);
    assert_eq!(received, to_b);
    assert_eq!(
        decrypt_message(&received, &secret(&b)).unwrap().as_deref(),
        Some("Hi B, it's A")
    );
    assert_eq!(decrypt_message(&received, &secret(&c)).unwrap(), None);

    let to_a = create_encrypted_message(
        "Hello back from B",
        &b,
        &public(&a),
        "user-b",
        "user-a",
        None,
    )
    .unwrap();
    let received = relay(&to_a);
    assert_eq!(
        decrypt_message(&received, &secret(&a)).unwrap().as_deref(),
        Some("Hello back from B")
    );
    assert_eq!(decrypt_message(&received, &secret(&c)).unwrap(), None);
}

#[test]
fn deeply_nested_object_roundtrip() {
    let a = generate_key_pair();
    let b = generate_key_pair();

    let document = json!({
        "level1": {
            "level2": {
                "level3": {
                    "level4": {
                        "level5": {
                            "level6": ["deep", 42, 3.25, true, null, {"k": "v"}]
                        }
                    }
                }
            },
            "siblings": [1, [2, [3, [4, [5]]]]]
        },
        "unicode": "héllo 🔐"
    });

    let encrypted = encrypt_asymmetric(document.clone(), &public(&b), &secret(&a)).unwrap();
    let back: serde_json::Value = decrypt_asymmetric_json(&encrypted, &secret(&b), None)
        .unwrap()
        .unwrap();
    assert_eq!(back, document);
}

#[test]
fn every_ciphertext_and_nonce_byte_is_authenticated() {
    let a = generate_key_pair();
    let b = generate_key_pair();
    let encrypted = encrypt_asymmetric("tamper target", &public(&b), &secret(&a)).unwrap();

    let ciphertext = murmur_crypto::decode_base64(&encrypted.ciphertext).unwrap();
    for i in 0..ciphertext.len() {
        let mut tampered = ciphertext.clone();
        tampered[i] ^= 0x01;
        let mut data = encrypted.clone();
        data.ciphertext = murmur_crypto::encode_base64(&tampered);
        assert_eq!(
            murmur_crypto::decrypt_asymmetric(&data, &secret(&b), None).unwrap(),
            None,
            "ciphertext byte {i}"
        );
    }

    let nonce = murmur_crypto::decode_base64(&encrypted.nonce).unwrap();
    for i in 0..nonce.len() {
        let mut tampered = nonce.clone();
        tampered[i] ^= 0x80;
        let mut data = encrypted.clone();
        data.nonce = murmur_crypto::encode_base64(&tampered);
        assert_eq!(
            murmur_crypto::decrypt_asymmetric(&data, &secret(&b), None).unwrap(),
            None,
            "nonce byte {i}"
        );
    }
}

#[test]
fn repeated_encryption_uses_fresh_nonces() {
    let a = generate_key_pair();
    let b = generate_key_pair();

    let nonces: std::collections::HashSet<String> = (0..200)
        .map(|_| {
            encrypt_asymmetric("same plaintext", &public(&b), &secret(&a))
                .unwrap()
                .nonce
        })
        .collect();
    assert_eq!(nonces.len(), 200);
}
