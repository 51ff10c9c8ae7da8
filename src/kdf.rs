//! Memory-hard key derivation for credential hashing.

use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

use crate::error::{CryptError, Result};

/// `Params` carries a suggested output length that `scrypt::scrypt` ignores;
/// the real length is the output buffer's.
const SCRYPT_PARAMS_LEN: usize = 32;

/// Derivation function and its cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kdf {
    Scrypt(ScryptParams),
    Argon2id(Argon2Params),
}

impl Default for Kdf {
    fn default() -> Self {
        Kdf::Scrypt(ScryptParams::default())
    }
}

impl Kdf {
    /// Fills `len` bytes derived from `secret` and `salt`.
    pub fn derive(&self, secret: &[u8], salt: &[u8], len: usize) -> Result<Zeroizing<Vec<u8>>> {
        let mut out = Zeroizing::new(vec![0u8; len]);
        match self {
            Kdf::Scrypt(params) => {
                params.validate()?;
                let params = scrypt::Params::new(params.log_n, params.r, params.p, SCRYPT_PARAMS_LEN)
                    .map_err(|e| CryptError::DerivationFailed(format!("scrypt params: {e}")))?;
                scrypt::scrypt(secret, salt, &params, &mut out)
                    .map_err(|e| CryptError::DerivationFailed(format!("scrypt: {e}")))?;
            }
            Kdf::Argon2id(params) => {
                params.validate()?;
                let params = Params::new(
                    params.mem_cost_kib,
                    params.time_cost,
                    params.parallelism,
                    Some(len),
                )
                .map_err(|e| CryptError::DerivationFailed(format!("argon2 params: {e}")))?;
                Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                    .hash_password_into(secret, salt, &mut out)
                    .map_err(|e| CryptError::DerivationFailed(format!("argon2: {e}")))?;
            }
        }
        Ok(out)
    }
}

/// scrypt cost parameters. Defaults match Node's `crypto.scrypt`
/// (N = 2^14, r = 8, p = 1) so stored hashes stay interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScryptParams {
    log_n: u8,
    r: u32,
    p: u32,
}

impl Default for ScryptParams {
    fn default() -> Self {
        Self {
            log_n: 14,
            r: 8,
            p: 1,
        }
    }
}

impl ScryptParams {
    pub fn new(log_n: u8, r: u32, p: u32) -> Result<Self> {
        let params = Self { log_n, r, p };
        params.validate()?;
        Ok(params)
    }

    pub fn log_n(&self) -> u8 {
        self.log_n
    }

    pub fn r(&self) -> u32 {
        self.r
    }

    pub fn p(&self) -> u32 {
        self.p
    }

    pub fn validate(&self) -> Result<()> {
        if self.log_n == 0 || self.log_n > 20 {
            return Err(CryptError::DerivationFailed(
                "scrypt log_n must be in 1..=20".to_string(),
            ));
        }
        if self.r == 0 || self.p == 0 {
            return Err(CryptError::DerivationFailed(
                "scrypt r and p must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    mem_cost_kib: u32,
    time_cost: u32,
    parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            // 64 MiB
            mem_cost_kib: 64 * 1024,
            time_cost: 3,
            parallelism: 1,
        }
    }
}

impl Argon2Params {
    pub fn new(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Result<Self> {
        let params = Self {
            mem_cost_kib,
            time_cost,
            parallelism,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn mem_cost_kib(&self) -> u32 {
        self.mem_cost_kib
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    pub fn parallelism(&self) -> u32 {
        self.parallelism
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(CryptError::DerivationFailed(msg.to_string()));
        if self.mem_cost_kib < 8 {
            return invalid("argon2 memory cost too low");
        }
        if self.time_cost < 1 {
            return invalid("argon2 time cost must be >= 1");
        }
        if self.parallelism < 1 {
            return invalid("argon2 parallelism must be >= 1");
        }
        if self.mem_cost_kib < 8 * self.parallelism {
            return invalid("argon2 memory cost must be at least 8 * parallelism");
        }
        Ok(())
    }
}
