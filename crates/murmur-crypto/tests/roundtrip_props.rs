//! Property tests: arbitrary plaintexts survive the asymmetric and symmetric
//! paths, and never open under the wrong key.

use murmur_crypto::{
    decrypt_asymmetric, decrypt_symmetric, encrypt_asymmetric, encrypt_symmetric,
    generate_key_pair, ByteInput,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn asymmetric_roundtrip(text in any::<String>()) {
        let a = generate_key_pair();
        let b = generate_key_pair();

        let data = encrypt_asymmetric(
            text.as_str(),
            &ByteInput::from(b.public_key()),
            &ByteInput::from(a.secret_key()),
        )
        .unwrap();
        let back = decrypt_asymmetric(&data, &ByteInput::from(b.secret_key()), None).unwrap();
        prop_assert_eq!(back, Some(text));
    }

    #[test]
    fn asymmetric_wrong_recipient_never_opens(text in ".{0,256}") {
        let a = generate_key_pair();
        let b = generate_key_pair();
        let c = generate_key_pair();

        let data = encrypt_asymmetric(
            text.as_str(),
            &ByteInput::from(b.public_key()),
            &ByteInput::from(a.secret_key()),
        )
        .unwrap();
        let back = decrypt_asymmetric(&data, &ByteInput::from(c.secret_key()), None).unwrap();
        prop_assert_eq!(back, None);
    }

    #[test]
    fn symmetric_roundtrip(text in any::<String>(), key in any::<[u8; 32]>()) {
        let key = ByteInput::from(key);
        let data = encrypt_symmetric(text.as_str(), &key).unwrap();
        prop_assert_eq!(decrypt_symmetric(&data, &key).unwrap(), Some(text));
    }

    #[test]
    fn symmetric_wrong_key_never_opens(key in any::<[u8; 32]>(), flip in 0usize..32) {
        let mut other = key;
        other[flip] ^= 0xFF;

        let data = encrypt_symmetric("payload", &ByteInput::from(key)).unwrap();
        prop_assert_eq!(decrypt_symmetric(&data, &ByteInput::from(other)).unwrap(), None);
    }
}
