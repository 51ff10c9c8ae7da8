//! Cryptographic collaborators around the signing and hashing core.
//!
//! Provides OS randomness, symmetric and asymmetric ciphers, and key
//! generation.

pub mod asymmetric;
pub mod keygen;
pub mod random;
pub mod symmetric;

pub use asymmetric::{private_decrypt, public_encrypt};
pub use keygen::{
    KeyPair, KeyPairAlgorithm, KeyPairOptions, Protection, SecretKeyKind, generate_key_pair,
    generate_key_pair_async, generate_secret_key,
};
pub use random::{fill_random, random_bytes};
pub use symmetric::{SymmetricKey, symmetric_decrypt, symmetric_encrypt};

/// Length of a symmetric cipher key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the XChaCha20-Poly1305 nonce (24 bytes).
pub const NONCE_LEN: usize = 24;
