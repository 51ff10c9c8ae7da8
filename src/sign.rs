//! Signature engine.
//!
//! [`sign`] and [`verify`] are the raw capability: bytes in, signature out.
//! [`SignedMessage`] pairs a serialized payload with its signature and has a
//! `payload:signature` text form.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use p256::ecdsa::Signature as EcSignature;
use rsa::pkcs1v15::{Signature as RsaSignature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use serde::Serialize;
use sha2::digest::const_oid::AssociatedOid;
use sha2::{Digest, Sha256, Sha384, Sha512};
use tracing::debug;

use crate::codec::{self, Encoding};
use crate::error::{CryptError, Result};
use crate::key::{self, Key};

type HmacSha256 = Hmac<Sha256>;

/// Separator between payload and signature in a signed message.
pub const SIGNED_SEPARATOR: char = ':';

/// Digest and signature scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    #[default]
    RsaSha256,
    RsaSha384,
    RsaSha512,
    /// ECDSA over P-256 with SHA-256, DER-encoded signatures.
    EcdsaP256Sha256,
    HmacSha256,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::RsaSha256 => "RSA-SHA256",
            Algorithm::RsaSha384 => "RSA-SHA384",
            Algorithm::RsaSha512 => "RSA-SHA512",
            Algorithm::EcdsaP256Sha256 => "ECDSA-SHA256",
            Algorithm::HmacSha256 => "HMAC-SHA256",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = CryptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rsa-sha256" | "sha256" | "rs256" | "sha256withrsaencryption" => Ok(Algorithm::RsaSha256),
            "rsa-sha384" | "sha384" | "rs384" => Ok(Algorithm::RsaSha384),
            "rsa-sha512" | "sha512" | "rs512" => Ok(Algorithm::RsaSha512),
            "ecdsa-sha256" | "ecdsa-with-sha256" | "es256" => Ok(Algorithm::EcdsaP256Sha256),
            "hmac-sha256" | "hs256" => Ok(Algorithm::HmacSha256),
            _ => Err(CryptError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Signs `message` with `key`. Requires a private key, or a secret key for HMAC.
pub fn sign(message: &[u8], key: &Key, algorithm: Algorithm) -> Result<Vec<u8>> {
    let failed = |reason: String| CryptError::SignatureFailed(format!("{algorithm}: {reason}"));

    let signature = match algorithm {
        Algorithm::RsaSha256 => rsa_sign::<Sha256>(message, key).map_err(failed)?,
        Algorithm::RsaSha384 => rsa_sign::<Sha384>(message, key).map_err(failed)?,
        Algorithm::RsaSha512 => rsa_sign::<Sha512>(message, key).map_err(failed)?,
        Algorithm::EcdsaP256Sha256 => {
            let signing_key = key::ec_signing(key).map_err(failed)?;
            let signature: EcSignature = signing_key
                .try_sign(message)
                .map_err(|e| failed(e.to_string()))?;
            signature.to_der().as_bytes().to_vec()
        }
        Algorithm::HmacSha256 => {
            let mut mac = HmacSha256::new_from_slice(key::secret(key).map_err(failed)?)
                .map_err(|e| failed(e.to_string()))?;
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
    };

    debug!(
        %algorithm,
        message_len = message.len(),
        signature_len = signature.len(),
        "signed message"
    );
    Ok(signature)
}

/// Checks `signature` over `message`.
///
/// A signature that does not match, or does not even parse, gives
/// `Ok(false)`. Errors are reserved for key material that cannot serve
/// `algorithm` at all.
pub fn verify(message: &[u8], signature: &[u8], key: &Key, algorithm: Algorithm) -> Result<bool> {
    let failed = |reason: String| CryptError::SignatureFailed(format!("{algorithm}: {reason}"));

    let valid = match algorithm {
        Algorithm::RsaSha256 => rsa_verify::<Sha256>(message, signature, key).map_err(failed)?,
        Algorithm::RsaSha384 => rsa_verify::<Sha384>(message, signature, key).map_err(failed)?,
        Algorithm::RsaSha512 => rsa_verify::<Sha512>(message, signature, key).map_err(failed)?,
        Algorithm::EcdsaP256Sha256 => {
            let verifying_key = key::ec_verifying(key).map_err(failed)?;
            match EcSignature::from_der(signature) {
                Ok(sig) => verifying_key.verify(message, &sig).is_ok(),
                Err(_) => false,
            }
        }
        Algorithm::HmacSha256 => {
            let mut mac = HmacSha256::new_from_slice(key::secret(key).map_err(failed)?)
                .map_err(|e| failed(e.to_string()))?;
            mac.update(message);
            mac.verify_slice(signature).is_ok()
        }
    };

    debug!(%algorithm, message_len = message.len(), valid, "verified signature");
    Ok(valid)
}

fn rsa_sign<D>(message: &[u8], key: &Key) -> key::LoadResult<Vec<u8>>
where
    D: Digest + AssociatedOid,
{
    let signing_key = SigningKey::<D>::new(key::rsa_private(key)?);
    let signature = signing_key.try_sign(message).map_err(|e| e.to_string())?;
    Ok(signature.to_vec())
}

fn rsa_verify<D>(message: &[u8], signature: &[u8], key: &Key) -> key::LoadResult<bool>
where
    D: Digest + AssociatedOid,
{
    let verifying_key = VerifyingKey::<D>::new(key::rsa_public(key)?);
    Ok(match RsaSignature::try_from(signature) {
        Ok(sig) => verifying_key.verify(message, &sig).is_ok(),
        Err(_) => false,
    })
}

/// Per-call signing configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignOptions {
    pub algorithm: Algorithm,
    /// Encoding of the signature in the text form.
    pub encoding: Encoding,
}

/// A serialized payload together with its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    payload: String,
    signature: Vec<u8>,
    algorithm: Algorithm,
}

impl SignedMessage {
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// `payload:signature`, the signature rendered in `encoding`.
    pub fn encode(&self, encoding: Encoding) -> String {
        format!(
            "{}{SIGNED_SEPARATOR}{}",
            self.payload,
            encoding.encode(&self.signature)
        )
    }

    /// Parses the text form. The split happens on the last `:`, so the
    /// payload itself may contain colons.
    pub fn parse(text: &str, options: SignOptions) -> Result<Self> {
        let (payload, signature) = text.rsplit_once(SIGNED_SEPARATOR).ok_or_else(|| {
            CryptError::MalformedToken("signed message has no ':' separator".to_string())
        })?;
        let signature = options
            .encoding
            .decode(signature)
            .map_err(|e| CryptError::MalformedToken(format!("signature segment: {e}")))?;
        Ok(Self {
            payload: payload.to_string(),
            signature,
            algorithm: options.algorithm,
        })
    }

    /// Recomputes the signature check against `key`.
    pub fn verify(&self, key: &Key) -> Result<bool> {
        verify(
            self.payload.as_bytes(),
            &self.signature,
            key,
            self.algorithm,
        )
    }
}

/// Serializes `payload` (always as JSON) and signs the result.
pub fn sign_payload<T: Serialize + ?Sized>(
    payload: &T,
    key: &Key,
    options: SignOptions,
) -> Result<SignedMessage> {
    sign_text(&codec::serialize(payload)?, key, options)
}

/// Signs text that is already serialized, verbatim.
pub fn sign_text(text: &str, key: &Key, options: SignOptions) -> Result<SignedMessage> {
    let signature = sign(text.as_bytes(), key, options.algorithm)?;
    Ok(SignedMessage {
        payload: text.to_string(),
        signature,
        algorithm: options.algorithm,
    })
}

/// Parses a `payload:signature` string and verifies it in one step.
pub fn verify_signed(text: &str, key: &Key, options: SignOptions) -> Result<bool> {
    SignedMessage::parse(text, options)?.verify(key)
}
