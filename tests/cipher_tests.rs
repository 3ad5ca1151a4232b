use cinema_api::crypto::{CipherError, FieldCipher, IV_LEN, UNENCRYPTED_SENTINEL};

const TEST_KEY: &str = "8f3c2a1b9d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8";
const OTHER_KEY: &str = "0000000000000000000000000000000000000000000000000000000000000001";

fn cipher() -> FieldCipher {
    FieldCipher::from_hex(TEST_KEY).unwrap()
}

#[test]
fn test_round_trip_restores_plaintext() {
    let cipher = cipher();
    for plaintext in ["Epic", "", "a much longer description spanning several AES blocks", "héllo ✓"] {
        let encoded = cipher.encrypt(plaintext).unwrap();
        assert_eq!(cipher.decrypt(&encoded).unwrap(), plaintext);
    }
}

#[test]
fn test_fresh_iv_per_call() {
    let cipher = cipher();
    let first = cipher.encrypt("Dune").unwrap();
    let second = cipher.encrypt("Dune").unwrap();

    assert_ne!(first, second, "same plaintext must not produce the same envelope");
    assert_eq!(cipher.decrypt(&first).unwrap(), "Dune");
    assert_eq!(cipher.decrypt(&second).unwrap(), "Dune");
}

#[test]
fn test_envelope_shape_is_hex_iv_colon_hex_ciphertext() {
    let encoded = cipher().encrypt("Epic").unwrap();
    let (iv, ciphertext) = encoded.split_once(':').unwrap();

    assert_eq!(iv.len(), IV_LEN * 2);
    assert!(iv.chars().all(|c| c.is_ascii_hexdigit()));
    // One padded AES block for a 4-byte plaintext.
    assert_eq!(ciphertext.len(), 32);
    assert!(ciphertext.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(!encoded.contains("Epic"));
}

#[test]
fn test_decrypt_without_separator_returns_sentinel() {
    let cipher = cipher();
    assert_eq!(cipher.decrypt("legacy plaintext").unwrap(), UNENCRYPTED_SENTINEL);
    assert_eq!(cipher.decrypt("").unwrap(), UNENCRYPTED_SENTINEL);
}

#[test]
fn test_decrypt_with_wrong_key_fails() {
    let encoded = cipher().encrypt("top secret plot twist").unwrap();
    let other = FieldCipher::from_hex(OTHER_KEY).unwrap();

    // A wrong key almost always breaks the padding; if the padding happens to
    // survive, the bytes are still not the original text.
    match other.decrypt(&encoded) {
        Err(CipherError::Decryption(_)) => {}
        Ok(text) => assert_ne!(text, "top secret plot twist"),
        Err(other) => panic!("unexpected error kind: {:?}", other),
    }
}

#[test]
fn test_decrypt_corrupted_envelope_fails() {
    let cipher = cipher();

    let not_hex = cipher.decrypt("zz:zz");
    assert!(matches!(not_hex, Err(CipherError::Decryption(_))));

    let short_iv = cipher.decrypt("abcd:00112233445566778899aabbccddeeff");
    assert!(matches!(short_iv, Err(CipherError::Decryption(_))));

    let encoded = cipher.encrypt("Epic").unwrap();
    let truncated = &encoded[..encoded.len() - 2];
    assert!(matches!(
        cipher.decrypt(truncated),
        Err(CipherError::Decryption(_))
    ));
}

#[test]
fn test_key_must_be_32_bytes_of_hex() {
    assert!(matches!(
        FieldCipher::from_hex("not-hex"),
        Err(CipherError::InvalidKey(_))
    ));
    assert!(matches!(
        FieldCipher::from_hex("00112233"),
        Err(CipherError::InvalidKey(_))
    ));
    assert!(FieldCipher::from_hex(TEST_KEY).is_ok());
}

#[test]
fn test_debug_output_hides_key() {
    assert_eq!(format!("{:?}", cipher()), "FieldCipher { .. }");
}
