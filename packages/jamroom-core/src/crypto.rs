//! Symmetric token encryption and secure random-string generation.
//!
//! Connection identifiers handed to clients are opaque capabilities: a
//! random plaintext id encrypted with the owning room's secret. The cipher
//! is AES in CFB mode with the variant (128/192/256) selected by key
//! length, a fresh 16-byte IV prepended to every ciphertext, and the
//! result base64-encoded with the standard alphabet. Possession of a
//! decryptable token is what proves membership in a specific room; there
//! is no revocation list because the secret dies with the room.

use aes::cipher::{AsyncStreamCipher, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use cfb_mode::{Decryptor, Encryptor};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

/// AES block size; also the length of the IV prepended to each ciphertext.
const IV_LEN: usize = 16;

/// Errors from token encryption and decryption.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key length must select an AES variant.
    #[error("invalid AES key size {0}: must be 16, 24, or 32 bytes")]
    InvalidKeyLength(usize),

    /// Token is not valid base64.
    #[error("token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded token is shorter than the IV.
    #[error("ciphertext too short")]
    CiphertextTooShort,

    /// Decrypted bytes are not UTF-8 (wrong key or corrupted token).
    #[error("decrypted token is not valid UTF-8")]
    NotUtf8(#[from] std::string::FromUtf8Error),
}

/// Generates a cryptographically random URL-safe string of exactly `len` characters.
#[must_use]
pub fn random_string(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    // base64 of n bytes is always at least n characters, so the truncation
    // never comes up short.
    let mut encoded = URL_SAFE_NO_PAD.encode(&bytes);
    encoded.truncate(len);
    encoded
}

/// Encrypts `plaintext` with AES-CFB under `key`, returning base64(IV || ciphertext).
///
/// A fresh IV is drawn per call, so encrypting the same plaintext twice
/// yields different tokens.
pub fn encrypt(plaintext: &str, key: &str) -> Result<String, CryptoError> {
    let key = key.as_bytes();
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let mut buf = plaintext.as_bytes().to_vec();
    apply_cfb(key, &iv, &mut buf, Direction::Encrypt)?;

    let mut out = Vec::with_capacity(IV_LEN + buf.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&buf);
    Ok(STANDARD.encode(&out))
}

/// Decrypts a token produced by [`encrypt`] with the same key.
pub fn decrypt(token: &str, key: &str) -> Result<String, CryptoError> {
    let key = key.as_bytes();
    let data = STANDARD.decode(token)?;
    if data.len() < IV_LEN {
        return Err(CryptoError::CiphertextTooShort);
    }

    let (iv, ciphertext) = data.split_at(IV_LEN);
    let mut buf = ciphertext.to_vec();
    apply_cfb(key, iv, &mut buf, Direction::Decrypt)?;

    Ok(String::from_utf8(buf)?)
}

#[derive(Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// Runs AES-CFB over `buf` in place, picking the AES variant by key length.
fn apply_cfb(key: &[u8], iv: &[u8], buf: &mut [u8], dir: Direction) -> Result<(), CryptoError> {
    macro_rules! run {
        ($aes:ty) => {
            match dir {
                Direction::Encrypt => Encryptor::<$aes>::new_from_slices(key, iv)
                    .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?
                    .encrypt(buf),
                Direction::Decrypt => Decryptor::<$aes>::new_from_slices(key, iv)
                    .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?
                    .decrypt(buf),
            }
        };
    }

    match key.len() {
        16 => run!(Aes128),
        24 => run!(Aes192),
        32 => run!(Aes256),
        other => return Err(CryptoError::InvalidKeyLength(other)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_128: &str = "0123456789abcdef";
    const KEY_192: &str = "0123456789abcdef01234567";
    const KEY_256: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn roundtrip_all_key_sizes() {
        for key in [KEY_128, KEY_192, KEY_256] {
            let token = encrypt("some connection id", key).unwrap();
            assert_eq!(decrypt(&token, key).unwrap(), "some connection id");
        }
    }

    #[test]
    fn roundtrip_empty_plaintext() {
        let token = encrypt("", KEY_256).unwrap();
        assert_eq!(decrypt(&token, KEY_256).unwrap(), "");
    }

    #[test]
    fn same_plaintext_yields_different_tokens() {
        let a = encrypt("repeat", KEY_256).unwrap();
        let b = encrypt("repeat", KEY_256).unwrap();
        assert_ne!(a, b, "fresh IV per call must vary the token");

        // Both still decrypt to the original.
        assert_eq!(decrypt(&a, KEY_256).unwrap(), "repeat");
        assert_eq!(decrypt(&b, KEY_256).unwrap(), "repeat");
    }

    #[test]
    fn invalid_key_length_rejected() {
        assert!(matches!(
            encrypt("x", "short"),
            Err(CryptoError::InvalidKeyLength(5))
        ));
        assert!(matches!(
            decrypt("aGVsbG8=", "short"),
            Err(CryptoError::InvalidKeyLength(5))
        ));
    }

    #[test]
    fn short_ciphertext_rejected() {
        // 8 decoded bytes, less than one IV.
        let token = STANDARD.encode([0u8; 8]);
        assert!(matches!(
            decrypt(&token, KEY_256),
            Err(CryptoError::CiphertextTooShort)
        ));
    }

    #[test]
    fn garbage_base64_rejected() {
        assert!(matches!(
            decrypt("not!!base64%%", KEY_256),
            Err(CryptoError::Base64(_))
        ));
    }

    #[test]
    fn wrong_key_does_not_recover_plaintext() {
        let token = encrypt("the plaintext", KEY_256).unwrap();
        let other_key = "fedcba9876543210fedcba9876543210";
        // Either the bytes fail UTF-8 validation or they decode to noise;
        // the one thing that must not happen is recovering the plaintext.
        match decrypt(&token, other_key) {
            Ok(plain) => assert_ne!(plain, "the plaintext"),
            Err(e) => assert!(matches!(e, CryptoError::NotUtf8(_))),
        }
    }

    #[test]
    fn random_string_has_exact_length() {
        for len in [1, 16, 32, 100] {
            assert_eq!(random_string(len).len(), len);
        }
    }

    #[test]
    fn random_string_is_url_safe() {
        let s = random_string(256);
        assert!(s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn random_strings_do_not_collide() {
        let a = random_string(32);
        let b = random_string(32);
        assert_ne!(a, b);
    }
}
