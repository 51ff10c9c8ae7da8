//! Authenticated symmetric encryption of JSON payloads.
//!
//! Wire form is `ciphertext.nonce`, both segments in the caller's
//! [`Encoding`]. The nonce is 24 random bytes drawn per encryption.

use std::fmt;

use chacha20poly1305::{
    Key as CipherKey, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::{KEY_LEN, NONCE_LEN, random};
use crate::codec::{self, Encoding};
use crate::error::{CryptError, Result};

/// Separator between ciphertext and nonce.
pub const CIPHER_SEPARATOR: char = '.';

/// A 256-bit XChaCha20-Poly1305 key.
#[derive(Clone)]
pub struct SymmetricKey(Zeroizing<[u8; KEY_LEN]>);

impl SymmetricKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptError::CipherFailed(format!(
                "key must be {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(Zeroizing::new(key)))
    }

    /// Uses the first 32 bytes of `text` as the key, so any passphrase or
    /// generated secret of at least that length can serve directly.
    pub fn from_text(text: &str) -> Result<Self> {
        let bytes = text.as_bytes();
        if bytes.len() < KEY_LEN {
            return Err(CryptError::CipherFailed(format!(
                "key text must be at least {KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Self::from_bytes(&bytes[..KEY_LEN])
    }

    pub fn generate() -> Result<Self> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        random::fill_random(key.as_mut_slice())?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(CipherKey::from_slice(self.0.as_slice()))
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// Serializes `payload` to JSON and encrypts it under a fresh nonce.
pub fn symmetric_encrypt<T: Serialize + ?Sized>(
    payload: &T,
    key: &SymmetricKey,
    encoding: Encoding,
) -> Result<String> {
    let plaintext = Zeroizing::new(codec::serialize(payload)?);
    let nonce = random::random_bytes(NONCE_LEN)?;

    let ciphertext = key
        .cipher()
        .encrypt(XNonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| CryptError::CipherFailed("encryption failed".to_string()))?;

    debug!(plaintext_len = plaintext.len(), %encoding, "encrypted payload");
    Ok(format!(
        "{}{CIPHER_SEPARATOR}{}",
        encoding.encode(ciphertext),
        encoding.encode(&nonce)
    ))
}

/// Decrypts `ciphertext.nonce`.
///
/// The plaintext is parsed as JSON when possible; otherwise it comes back as
/// a JSON string holding the raw text.
pub fn symmetric_decrypt(text: &str, key: &SymmetricKey, encoding: Encoding) -> Result<Value> {
    let (ciphertext, nonce) = text.split_once(CIPHER_SEPARATOR).ok_or_else(|| {
        CryptError::CipherFailed("cipher text has no '.' separator".to_string())
    })?;
    let nonce = encoding.decode(nonce)?;
    if nonce.len() != NONCE_LEN {
        return Err(CryptError::CipherFailed(format!(
            "nonce must be {NONCE_LEN} bytes, got {}",
            nonce.len()
        )));
    }
    let ciphertext = encoding.decode(ciphertext)?;

    let plaintext = key
        .cipher()
        .decrypt(XNonce::from_slice(&nonce), ciphertext.as_slice())
        .map_err(|_| {
            warn!("symmetric decryption rejected: wrong key or corrupted data");
            CryptError::CipherFailed("wrong key or corrupted data".to_string())
        })?;
    let plaintext = Zeroizing::new(plaintext);

    let text = std::str::from_utf8(&plaintext)
        .map_err(|_| CryptError::CipherFailed("plaintext is not UTF-8".to_string()))?;
    Ok(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key() -> SymmetricKey {
        SymmetricKey::from_text("0123456789abcdef0123456789abcdef-and-more").unwrap()
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let payload = json!({"user": "ada", "roles": ["admin"]});
        let sealed = symmetric_encrypt(&payload, &key(), Encoding::Hex).unwrap();
        assert_eq!(symmetric_decrypt(&sealed, &key(), Encoding::Hex).unwrap(), payload);
    }

    #[test]
    fn strings_come_back_as_strings() {
        let sealed = symmetric_encrypt("plain text", &key(), Encoding::Base64).unwrap();
        assert_eq!(
            symmetric_decrypt(&sealed, &key(), Encoding::Base64).unwrap(),
            json!("plain text")
        );
    }

    #[test]
    fn nonce_is_full_width_and_fresh() {
        for encoding in [Encoding::Hex, Encoding::Base64, Encoding::Base64Url] {
            let a = symmetric_encrypt(&1, &key(), encoding).unwrap();
            let b = symmetric_encrypt(&1, &key(), encoding).unwrap();

            let (_, nonce_a) = a.split_once('.').unwrap();
            let (_, nonce_b) = b.split_once('.').unwrap();
            assert_eq!(encoding.decode(nonce_a).unwrap().len(), NONCE_LEN);
            assert_ne!(nonce_a, nonce_b);
            assert_eq!(symmetric_decrypt(&a, &key(), encoding).unwrap(), json!(1));
        }

        let sealed = symmetric_encrypt(&1, &key(), Encoding::Hex).unwrap();
        let (_, nonce) = sealed.split_once('.').unwrap();
        assert_eq!(nonce.len(), 2 * NONCE_LEN);
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = symmetric_encrypt("secret", &key(), Encoding::Hex).unwrap();
        let other = SymmetricKey::generate().unwrap();
        assert!(matches!(
            symmetric_decrypt(&sealed, &other, Encoding::Hex),
            Err(CryptError::CipherFailed(_))
        ));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let sealed = symmetric_encrypt("secret", &key(), Encoding::Hex).unwrap();
        let flipped = if sealed.starts_with('0') { "1" } else { "0" };
        let tampered = format!("{flipped}{}", &sealed[1..]);
        assert!(symmetric_decrypt(&tampered, &key(), Encoding::Hex).is_err());
    }

    #[test]
    fn malformed_cipher_text_is_rejected() {
        assert!(symmetric_decrypt("no-separator", &key(), Encoding::Hex).is_err());
        assert!(symmetric_decrypt("abcd.short", &key(), Encoding::Hex).is_err());
        assert!(matches!(
            symmetric_decrypt("abcd.00112233", &key(), Encoding::Hex),
            Err(CryptError::CipherFailed(_))
        ));
        let zero_nonce = "00".repeat(NONCE_LEN);
        assert!(matches!(
            symmetric_decrypt(&format!("zz.{zero_nonce}"), &key(), Encoding::Hex),
            Err(CryptError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn short_key_text_is_rejected() {
        assert!(SymmetricKey::from_text("too short").is_err());
        assert!(SymmetricKey::from_bytes(&[0u8; 16]).is_err());
        assert_eq!(SymmetricKey::generate().unwrap().as_bytes().len(), KEY_LEN);
    }
}
