use std::fmt;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, CryptError>;

/// Every failure the toolkit can report.
///
/// Structural problems with caller input (`MalformedToken`, `InvalidStoredFormat`,
/// `InvalidExpirySpec`, ...) are errors. A well-formed token or signed message
/// whose signature simply does not match is *not* an error: verification
/// reports `false` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptError {
    /// Text is not valid for the selected transport encoding.
    MalformedEncoding(String),
    /// Token or signed message has the wrong shape or an undecodable segment.
    MalformedToken(String),
    /// Stored credential hash is not `salt:derivedKey`.
    InvalidStoredFormat(String),
    /// Expiry is neither a number, a known shorthand, nor a parseable date.
    InvalidExpirySpec(String),
    /// The key-derivation function rejected its parameters.
    DerivationFailed(String),
    /// Key material is unusable for signing or verification.
    SignatureFailed(String),
    /// Algorithm name is not one the toolkit implements.
    UnsupportedAlgorithm(String),
    /// Payload could not be serialized to JSON.
    Serialization(String),
    /// Symmetric or asymmetric encryption/decryption failed.
    CipherFailed(String),
    /// Key pair or secret key generation failed.
    KeyGeneration(String),
    /// The OS random generator could not be read.
    RandomUnavailable,
}

impl fmt::Display for CryptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptError::MalformedEncoding(msg) => write!(f, "malformed encoding: {msg}"),
            CryptError::MalformedToken(msg) => write!(f, "malformed token: {msg}"),
            CryptError::InvalidStoredFormat(msg) => write!(f, "invalid stored hash: {msg}"),
            CryptError::InvalidExpirySpec(spec) => write!(f, "invalid expiry '{spec}'"),
            CryptError::DerivationFailed(msg) => write!(f, "key derivation failed: {msg}"),
            CryptError::SignatureFailed(msg) => write!(f, "signature operation failed: {msg}"),
            CryptError::UnsupportedAlgorithm(alg) => write!(f, "unsupported algorithm '{alg}'"),
            CryptError::Serialization(msg) => write!(f, "payload serialization failed: {msg}"),
            CryptError::CipherFailed(msg) => write!(f, "cipher operation failed: {msg}"),
            CryptError::KeyGeneration(msg) => write!(f, "key generation failed: {msg}"),
            CryptError::RandomUnavailable => write!(f, "OS random generator unavailable"),
        }
    }
}

impl std::error::Error for CryptError {}

impl From<serde_json::Error> for CryptError {
    fn from(err: serde_json::Error) -> Self {
        CryptError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_input() {
        let err = CryptError::InvalidExpirySpec("soon".to_string());
        assert_eq!(err.to_string(), "invalid expiry 'soon'");

        let err = CryptError::UnsupportedAlgorithm("md5".to_string());
        assert!(err.to_string().contains("md5"));
    }

    #[test]
    fn json_errors_become_serialization_errors() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        match CryptError::from(json_err) {
            CryptError::Serialization(msg) => assert!(!msg.is_empty()),
            other => panic!("expected Serialization, got: {other:?}"),
        }
    }
}
