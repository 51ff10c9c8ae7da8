use getrandom::fill;
use tracing::error;

use crate::error::{CryptError, Result};

/// Fill buffer with cryptographically secure random bytes
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    fill(buf).map_err(|e| {
        error!(error = %e, "OS random generator failed");
        CryptError::RandomUnavailable
    })
}

/// `len` fresh random bytes
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    fill_random(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_have_requested_length() {
        assert_eq!(random_bytes(0).unwrap().len(), 0);
        assert_eq!(random_bytes(64).unwrap().len(), 64);
    }

    #[test]
    fn consecutive_draws_differ() {
        assert_ne!(random_bytes(32).unwrap(), random_bytes(32).unwrap());
    }
}
