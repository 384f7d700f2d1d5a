use murmur_crypto::{
    decrypt_asymmetric, derive_key_from_password, encrypt_asymmetric, generate_key_pair,
    ByteInput, KdfParams,
};
use secrecy::SecretString;

fn make_text(size: usize) -> String {
    (0..size)
        .map(|i| char::from(b'a' + ((i.wrapping_mul(7) ^ (i >> 3)) % 26) as u8))
        .collect()
}

#[divan::bench(args = [64, 4096, 65536])]
fn bench_encrypt_asymmetric(bencher: divan::Bencher, size: usize) {
    let sender = generate_key_pair();
    let recipient = generate_key_pair();
    let recipient_pk = ByteInput::from(recipient.public_key());
    let sender_sk = ByteInput::from(sender.secret_key());
    let text = make_text(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            encrypt_asymmetric(
                divan::black_box(text.as_str()),
                divan::black_box(&recipient_pk),
                divan::black_box(&sender_sk),
            )
            .unwrap()
        });
}

#[divan::bench(args = [64, 4096, 65536])]
fn bench_decrypt_asymmetric(bencher: divan::Bencher, size: usize) {
    let sender = generate_key_pair();
    let recipient = generate_key_pair();
    let recipient_sk = ByteInput::from(recipient.secret_key());
    let encrypted = encrypt_asymmetric(
        make_text(size),
        &ByteInput::from(recipient.public_key()),
        &ByteInput::from(sender.secret_key()),
    )
    .unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            decrypt_asymmetric(
                divan::black_box(&encrypted),
                divan::black_box(&recipient_sk),
                None,
            )
            .unwrap()
        });
}

#[divan::bench(sample_count = 10)]
fn bench_derive_key_default_iterations(bencher: divan::Bencher) {
    let password = SecretString::from("correct horse battery staple");
    let salt = ByteInput::from([7u8; 16]);
    let params = KdfParams::default();
    bencher.bench(|| {
        derive_key_from_password(
            divan::black_box(&password),
            divan::black_box(&salt),
            &params,
        )
        .unwrap()
    });
}

fn main() {
    divan::main();
}
