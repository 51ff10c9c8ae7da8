//! Key material as the toolkit consumes it.
//!
//! A [`Key`] is opaque to the signing and token layers: they forward it to
//! the loader functions here, which turn PEM text into RustCrypto key types
//! for the algorithm at hand.

use std::fmt;

use p256::ecdsa::{SigningKey as EcSigningKey, VerifyingKey as EcVerifyingKey};
use pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

/// Reason a key could not be loaded; callers wrap it in the error variant
/// that fits their operation.
pub(crate) type LoadResult<T> = std::result::Result<T, String>;

/// Signing, verification or cipher key.
#[derive(Clone)]
pub enum Key {
    /// PEM text: PKCS#8 or PKCS#1 private key, SPKI or PKCS#1 public key,
    /// or a SEC1 EC private key.
    Pem(Zeroizing<String>),
    /// Passphrase-protected PKCS#8 private key.
    EncryptedPem {
        pem: Zeroizing<String>,
        passphrase: Zeroizing<String>,
    },
    /// Raw symmetric secret, used by HMAC algorithms.
    Secret(Zeroizing<Vec<u8>>),
}

impl Key {
    pub fn pem(pem: impl Into<String>) -> Self {
        Key::Pem(Zeroizing::new(pem.into()))
    }

    pub fn encrypted_pem(pem: impl Into<String>, passphrase: impl Into<String>) -> Self {
        Key::EncryptedPem {
            pem: Zeroizing::new(pem.into()),
            passphrase: Zeroizing::new(passphrase.into()),
        }
    }

    pub fn secret(bytes: impl Into<Vec<u8>>) -> Self {
        Key::Secret(Zeroizing::new(bytes.into()))
    }

    fn kind(&self) -> &'static str {
        match self {
            Key::Pem(pem) => match pem_label(pem) {
                Some(label) if label.contains("PUBLIC") => "public key",
                Some(_) => "private key",
                None => "unlabelled PEM",
            },
            Key::EncryptedPem { .. } => "encrypted private key",
            Key::Secret(_) => "secret key",
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.kind())
    }
}

/// Label between `-----BEGIN ` and the closing dashes.
fn pem_label(pem: &str) -> Option<&str> {
    const BEGIN: &str = "-----BEGIN ";
    let start = pem.find(BEGIN)? + BEGIN.len();
    let rest = &pem[start..];
    let end = rest.find("-----")?;
    Some(&rest[..end])
}

pub(crate) fn rsa_private(key: &Key) -> LoadResult<RsaPrivateKey> {
    match key {
        Key::EncryptedPem { pem, passphrase } => {
            RsaPrivateKey::from_pkcs8_encrypted_pem(pem, passphrase.as_bytes())
                .map_err(|e| format!("cannot decrypt RSA private key: {e}"))
        }
        Key::Pem(pem) => match pem_label(pem) {
            Some("PRIVATE KEY") => RsaPrivateKey::from_pkcs8_pem(pem)
                .map_err(|e| format!("invalid PKCS#8 RSA private key: {e}")),
            Some("RSA PRIVATE KEY") => RsaPrivateKey::from_pkcs1_pem(pem)
                .map_err(|e| format!("invalid PKCS#1 RSA private key: {e}")),
            Some("ENCRYPTED PRIVATE KEY") => {
                Err("encrypted private key needs a passphrase".to_string())
            }
            _ => Err(format!("expected an RSA private key, got {}", key.kind())),
        },
        Key::Secret(_) => Err("RSA needs a PEM key, got a secret key".to_string()),
    }
}

/// Public half of an RSA key; private keys are accepted and reduced.
pub(crate) fn rsa_public(key: &Key) -> LoadResult<RsaPublicKey> {
    if let Key::Pem(pem) = key {
        match pem_label(pem) {
            Some("PUBLIC KEY") => {
                return RsaPublicKey::from_public_key_pem(pem)
                    .map_err(|e| format!("invalid SPKI RSA public key: {e}"));
            }
            Some("RSA PUBLIC KEY") => {
                return RsaPublicKey::from_pkcs1_pem(pem)
                    .map_err(|e| format!("invalid PKCS#1 RSA public key: {e}"));
            }
            _ => {}
        }
    }
    rsa_private(key).map(|private| private.to_public_key())
}

pub(crate) fn ec_signing(key: &Key) -> LoadResult<EcSigningKey> {
    match key {
        Key::EncryptedPem { pem, passphrase } => {
            EcSigningKey::from_pkcs8_encrypted_pem(pem, passphrase.as_bytes())
                .map_err(|e| format!("cannot decrypt P-256 private key: {e}"))
        }
        Key::Pem(pem) => match pem_label(pem) {
            Some("PRIVATE KEY") => EcSigningKey::from_pkcs8_pem(pem)
                .map_err(|e| format!("invalid PKCS#8 P-256 private key: {e}")),
            Some("EC PRIVATE KEY") => p256::SecretKey::from_sec1_pem(pem)
                .map(EcSigningKey::from)
                .map_err(|e| format!("invalid SEC1 P-256 private key: {e}")),
            Some("ENCRYPTED PRIVATE KEY") => {
                Err("encrypted private key needs a passphrase".to_string())
            }
            _ => Err(format!("expected a P-256 private key, got {}", key.kind())),
        },
        Key::Secret(_) => Err("ECDSA needs a PEM key, got a secret key".to_string()),
    }
}

pub(crate) fn ec_verifying(key: &Key) -> LoadResult<EcVerifyingKey> {
    if let Key::Pem(pem) = key {
        if pem_label(pem) == Some("PUBLIC KEY") {
            return EcVerifyingKey::from_public_key_pem(pem)
                .map_err(|e| format!("invalid SPKI P-256 public key: {e}"));
        }
    }
    ec_signing(key).map(|signing| *signing.verifying_key())
}

pub(crate) fn secret(key: &Key) -> LoadResult<&[u8]> {
    match key {
        Key::Secret(bytes) => Ok(bytes.as_slice()),
        other => Err(format!("HMAC needs a secret key, got {}", other.kind())),
    }
}
