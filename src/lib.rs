//! Salted credential hashing, signatures and expiring bearer tokens.
//!
//! The core is four pieces that build on each other: [`codec`] renders bytes
//! and payloads as text, [`sign`] signs and verifies, [`hash`] derives and
//! compares salted credentials, and [`token`] composes signed, optionally
//! expiring bearer tokens. [`crypto`] holds the ciphers and key generation
//! around that core.

pub mod clock;
pub mod codec;
pub mod crypto;
mod error;
pub mod expiry;
pub mod hash;
pub mod kdf;
pub mod key;
pub mod keyfile;
pub mod sign;
pub mod token;

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::codec::Encoding;
pub use crate::error::{CryptError, Result};
pub use crate::expiry::ExpirySpec;
pub use crate::hash::{CredentialHash, HashOptions, compare, compare_async, hash, hash_async};
pub use crate::kdf::{Argon2Params, Kdf, ScryptParams};
pub use crate::key::Key;
pub use crate::keyfile::KeyFile;
pub use crate::sign::{Algorithm, SignOptions, SignedMessage};
pub use crate::token::{
    BearerToken, PayloadSource, TokenOptions, TokenVerification, VerifyOptions, create_token,
    verify_token,
};
