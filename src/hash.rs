//! Salted credential hashing.
//!
//! A stored credential is `salt:derivedKey`, both halves in the configured
//! [`Encoding`]. The salt is fed to the KDF in its textual form, which keeps
//! hashes compatible with stores produced by Node's `crypto.scrypt` tooling.
//!
//! [`hash`] and [`compare`] block the calling thread. [`hash_async`] and
//! [`compare_async`] run the same code on tokio's blocking pool.

use std::fmt;

use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::codec::Encoding;
use crate::crypto::random;
use crate::error::{CryptError, Result};
use crate::kdf::Kdf;

/// Separator between salt and derived key.
pub const HASH_SEPARATOR: char = ':';
/// Default salt and derived key length in bytes.
pub const DEFAULT_LENGTH: usize = 64;
/// Upper bound on `length`, keeping derivation cost bounded.
pub const MAX_LENGTH: usize = 1024;

/// Per-call hashing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashOptions {
    /// Salt length and derived key length, in bytes.
    pub length: usize,
    pub encoding: Encoding,
    pub kdf: Kdf,
}

impl Default for HashOptions {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH,
            encoding: Encoding::Hex,
            kdf: Kdf::default(),
        }
    }
}

impl HashOptions {
    fn check_length(&self) -> Result<()> {
        if self.length == 0 || self.length > MAX_LENGTH {
            return Err(CryptError::DerivationFailed(format!(
                "length must be in 1..={MAX_LENGTH}, got {}",
                self.length
            )));
        }
        Ok(())
    }
}

/// A salted, derived credential.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialHash {
    salt: String,
    derived_key: Zeroizing<Vec<u8>>,
    encoding: Encoding,
}

impl CredentialHash {
    /// Parses `salt:derivedKey`.
    ///
    /// # Errors
    ///
    /// [`CryptError::InvalidStoredFormat`] if the separator is missing or
    /// repeated, or if either half is not valid in `encoding`.
    pub fn parse(stored: &str, encoding: Encoding) -> Result<Self> {
        let (salt, key) = stored.split_once(HASH_SEPARATOR).ok_or_else(|| {
            CryptError::InvalidStoredFormat("missing ':' separator".to_string())
        })?;
        if key.contains(HASH_SEPARATOR) {
            return Err(CryptError::InvalidStoredFormat(
                "more than one ':' separator".to_string(),
            ));
        }
        encoding
            .decode(salt)
            .map_err(|e| CryptError::InvalidStoredFormat(format!("salt: {e}")))?;
        let derived_key = encoding
            .decode(key)
            .map_err(|e| CryptError::InvalidStoredFormat(format!("derived key: {e}")))?;

        Ok(Self {
            salt: salt.to_string(),
            derived_key: Zeroizing::new(derived_key),
            encoding,
        })
    }

    /// Salt in its encoded form, exactly as the KDF consumes it.
    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn derived_key(&self) -> &[u8] {
        &self.derived_key
    }

    /// Re-derives from `candidate` and compares in constant time.
    ///
    /// A candidate whose derived length differs from the stored key
    /// (different `length` option) never matches.
    pub fn matches(&self, candidate: impl AsRef<[u8]>, options: &HashOptions) -> Result<bool> {
        options.check_length()?;
        let derived = options
            .kdf
            .derive(candidate.as_ref(), self.salt.as_bytes(), options.length)?;
        Ok(constant_time_eq(&derived, &self.derived_key))
    }
}

impl fmt::Display for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{HASH_SEPARATOR}{}",
            self.salt,
            self.encoding.encode(self.derived_key.as_slice())
        )
    }
}

impl fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialHash")
            .field("salt", &self.salt)
            .field("derived_key_len", &self.derived_key.len())
            .field("encoding", &self.encoding)
            .finish()
    }
}

/// Hashes `secret` with a fresh random salt.
pub fn hash(secret: impl AsRef<[u8]>, options: &HashOptions) -> Result<CredentialHash> {
    options.check_length()?;
    let salt = options.encoding.encode(random::random_bytes(options.length)?);
    let derived_key = options
        .kdf
        .derive(secret.as_ref(), salt.as_bytes(), options.length)?;

    debug!(length = options.length, encoding = %options.encoding, "hashed credential");
    Ok(CredentialHash {
        salt,
        derived_key,
        encoding: options.encoding,
    })
}

/// Checks `candidate` against a stored `salt:derivedKey` string.
pub fn compare(stored: &str, candidate: impl AsRef<[u8]>, options: &HashOptions) -> Result<bool> {
    let matched = CredentialHash::parse(stored, options.encoding)?.matches(candidate, options)?;
    if !matched {
        debug!("credential did not match");
    }
    Ok(matched)
}

/// [`hash`] on tokio's blocking pool.
///
/// Must be awaited inside a tokio runtime. Dropping the future abandons the
/// result; the derivation itself runs to completion in the background.
pub async fn hash_async(secret: impl AsRef<[u8]>, options: HashOptions) -> Result<CredentialHash> {
    let secret = Zeroizing::new(secret.as_ref().to_vec());
    run_blocking(move || hash(secret.as_slice(), &options)).await
}

/// [`compare`] on tokio's blocking pool.
pub async fn compare_async(
    stored: impl Into<String>,
    candidate: impl AsRef<[u8]>,
    options: HashOptions,
) -> Result<bool> {
    let stored = stored.into();
    let candidate = Zeroizing::new(candidate.as_ref().to_vec());
    run_blocking(move || compare(&stored, candidate.as_slice(), &options)).await
}

async fn run_blocking<T, F>(job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job).await.map_err(|e| {
        warn!(error = %e, "derivation task did not complete");
        CryptError::DerivationFailed(format!("derivation task failed: {e}"))
    })?
}

/// Compares two byte strings without branching on their contents.
///
/// Unequal lengths return `false` straight away; lengths are not secret here.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
