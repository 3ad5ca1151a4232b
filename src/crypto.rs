use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use rand::{RngCore, rngs::OsRng};
use std::sync::Arc;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Length of the AES-256 key in bytes.
pub const KEY_LEN: usize = 32;
/// Length of the CBC initialization vector in bytes.
pub const IV_LEN: usize = 16;
/// Returned by `decrypt` for values that were never encrypted (or lost their envelope).
pub const UNENCRYPTED_SENTINEL: &str = "invalid or unencrypted data";

const SEPARATOR: char = ':';

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),
    #[error("{0}")]
    Encryption(String),
    #[error("{0}")]
    Decryption(String),
}

/// FieldCipher
///
/// Symmetric codec for sensitive text fields. Every call to `encrypt` draws a
/// fresh IV from the OS random source; the stored form is
/// `hex(iv) + ":" + hex(ciphertext)` using AES-256-CBC with PKCS#7 padding.
///
/// The key is fixed at construction and never mutated, so one instance is shared
/// read-only by every request.
#[derive(Clone)]
pub struct FieldCipher {
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}

impl FieldCipher {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// from_hex
    ///
    /// Parses a 64-character hex key as loaded from configuration.
    pub fn from_hex(encoded: &str) -> Result<Self, CipherError> {
        let bytes = hex::decode(encoded.trim())
            .map_err(|e| CipherError::InvalidKey(format!("key is not valid hex: {}", e)))?;

        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            CipherError::InvalidKey(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            ))
        })?;

        Ok(Self::new(key))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let encryptor = Aes256CbcEnc::new_from_slices(&self.key, &iv)
            .map_err(|e| CipherError::Encryption(e.to_string()))?;
        let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        Ok(format!(
            "{}{}{}",
            hex::encode(iv),
            SEPARATOR,
            hex::encode(ciphertext)
        ))
    }

    /// decrypt
    ///
    /// Fails closed on legacy data: an empty value or one without the `:`
    /// separator yields `UNENCRYPTED_SENTINEL` instead of an error. Anything that
    /// looks like an envelope but does not decrypt (wrong key, corrupted bytes)
    /// is a `CipherError::Decryption`.
    pub fn decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        let Some((iv_hex, ciphertext_hex)) = encoded.split_once(SEPARATOR) else {
            return Ok(UNENCRYPTED_SENTINEL.to_string());
        };

        let iv = hex::decode(iv_hex)
            .map_err(|e| CipherError::Decryption(format!("iv is not valid hex: {}", e)))?;
        if iv.len() != IV_LEN {
            return Err(CipherError::Decryption(format!(
                "iv must be {} bytes, got {}",
                IV_LEN,
                iv.len()
            )));
        }

        let ciphertext = hex::decode(ciphertext_hex)
            .map_err(|e| CipherError::Decryption(format!("ciphertext is not valid hex: {}", e)))?;

        let decryptor = Aes256CbcDec::new_from_slices(&self.key, &iv)
            .map_err(|e| CipherError::Decryption(e.to_string()))?;
        let plaintext = decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CipherError::Decryption("bad padding or wrong key".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| CipherError::Decryption("plaintext is not valid UTF-8".to_string()))
    }
}

/// CipherState
///
/// The shared handle stored in the application state.
pub type CipherState = Arc<FieldCipher>;
