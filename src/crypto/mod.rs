//! Cipher primitives used by sources that hide their stream endpoints.
//!
//! Player backends wrap their payloads in AES-CBC with PKCS#7 padding. Keys and
//! IVs are the *literal bytes* of the strings the sites ship (no hex or base64
//! decoding), so a 32-character key selects AES-256 and a 16-character key
//! AES-128. Ciphertext travels as standard-alphabet base64.
//!
//! None of this is security. The key material is obfuscation lifted from the
//! sites' own players and breaks whenever they rotate it.
//!
//! # Example
//!
//! ```rust
//! use cinefetch::crypto::{cipher_transform, derive_key};
//!
//! let iv = "3134003223491201";
//! let key = "37911490979715163134003223491201";
//! let sealed = cipher_transform("MTIzNDU", iv, key, true).unwrap();
//! assert_eq!(cipher_transform(&sealed, iv, key, false).unwrap(), "MTIzNDU");
//!
//! assert_eq!(derive_key("abc"), "616263");
//! ```

pub mod vrf;

use aes::{Aes128, Aes192, Aes256};
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use thiserror::Error;

/// Length of the hex key produced by [`derive_key`].
pub const DERIVED_KEY_LEN: usize = 32;

/// Standard alphabet, padding optional on decode.
pub(crate) const BASE64_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Cipher layer failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("unsupported key length: {0} bytes")]
    KeyLength(usize),

    #[error("invalid key or iv length")]
    InvalidLength,

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("bad padding (wrong key or iv?)")]
    Padding,

    #[error("decrypted payload is not UTF-8")]
    Utf8,
}

/// Encrypt or decrypt `data` with AES-CBC/PKCS#7.
///
/// When `encrypt` is true, `data` is plaintext and the result is base64.
/// Otherwise `data` is base64 ciphertext and the result is UTF-8 plaintext.
pub fn cipher_transform(
    data: &str,
    iv: &str,
    key: &str,
    encrypt: bool,
) -> Result<String, CryptoError> {
    if encrypt {
        let sealed = seal(data.as_bytes(), key.as_bytes(), iv.as_bytes())?;
        Ok(STANDARD.encode(sealed))
    } else {
        let raw = STANDARD.decode(data.trim())?;
        let plain = open(&raw, key.as_bytes(), iv.as_bytes())?;
        String::from_utf8(plain).map_err(|_| CryptoError::Utf8)
    }
}

/// Shorthand for `cipher_transform(plaintext, iv, key, true)`.
pub fn encrypt(plaintext: &str, iv: &str, key: &str) -> Result<String, CryptoError> {
    cipher_transform(plaintext, iv, key, true)
}

/// Shorthand for `cipher_transform(ciphertext, iv, key, false)`.
pub fn decrypt(ciphertext: &str, iv: &str, key: &str) -> Result<String, CryptoError> {
    cipher_transform(ciphertext, iv, key, false)
}

/// Stretch `seed` into a lowercase hex key.
///
/// Each character contributes the hex form of its code point. Output stops at
/// [`DERIVED_KEY_LEN`] characters; shorter seeds yield the full, shorter string.
pub fn derive_key(seed: &str) -> String {
    let mut hex = String::with_capacity(DERIVED_KEY_LEN + 8);
    for c in seed.chars() {
        if hex.len() >= DERIVED_KEY_LEN {
            break;
        }
        hex.push_str(&format!("{:x}", u32::from(c)));
    }
    hex.truncate(DERIVED_KEY_LEN);
    hex
}

fn seal(plain: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let out = match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|_| CryptoError::InvalidLength)?
            .encrypt_padded_vec_mut::<Pkcs7>(plain),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(|_| CryptoError::InvalidLength)?
            .encrypt_padded_vec_mut::<Pkcs7>(plain),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|_| CryptoError::InvalidLength)?
            .encrypt_padded_vec_mut::<Pkcs7>(plain),
        n => return Err(CryptoError::KeyLength(n)),
    };
    Ok(out)
}

fn open(sealed: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let out = match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|_| CryptoError::InvalidLength)?
            .decrypt_padded_vec_mut::<Pkcs7>(sealed),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(|_| CryptoError::InvalidLength)?
            .decrypt_padded_vec_mut::<Pkcs7>(sealed),
        32 => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|_| CryptoError::InvalidLength)?
            .decrypt_padded_vec_mut::<Pkcs7>(sealed),
        n => return Err(CryptoError::KeyLength(n)),
    };
    out.map_err(|_| CryptoError::Padding)
}
