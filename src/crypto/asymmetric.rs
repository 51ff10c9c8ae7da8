//! RSA-OAEP (SHA-256) encryption of JSON payloads.

use rand::rngs::OsRng;
use rsa::Oaep;
use serde::Serialize;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::codec::{self, Encoding};
use crate::error::{CryptError, Result};
use crate::key::{self, Key};

/// Encrypts the JSON serialization of `payload` with an RSA public key.
///
/// A private key is accepted too; its public half is used.
pub fn public_encrypt<T: Serialize + ?Sized>(
    payload: &T,
    key: &Key,
    encoding: Encoding,
) -> Result<String> {
    let public = key::rsa_public(key).map_err(CryptError::CipherFailed)?;
    let plaintext = codec::serialize(payload)?;

    let ciphertext = public
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext.as_bytes())
        .map_err(|e| CryptError::CipherFailed(format!("RSA-OAEP encrypt: {e}")))?;

    debug!(plaintext_len = plaintext.len(), "public-key encrypted payload");
    Ok(encoding.encode(ciphertext))
}

/// Decrypts text produced by [`public_encrypt`], returning the JSON text.
pub fn private_decrypt(text: &str, key: &Key, encoding: Encoding) -> Result<String> {
    let private = key::rsa_private(key).map_err(CryptError::CipherFailed)?;
    let ciphertext = encoding.decode(text)?;

    let plaintext = private
        .decrypt(Oaep::new::<Sha256>(), &ciphertext)
        .map_err(|e| {
            warn!("private-key decryption rejected");
            CryptError::CipherFailed(format!("RSA-OAEP decrypt: {e}"))
        })?;

    String::from_utf8(plaintext)
        .map_err(|_| CryptError::CipherFailed("plaintext is not UTF-8".to_string()))
}
