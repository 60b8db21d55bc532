//! Symmetric key material.
//!
//! Keys cross every API boundary as base64 strings of exactly 32 raw
//! bytes (AES-256).  Inside the crate they live in `KeyMaterial`, which
//! zeroes its memory on drop and never prints its contents.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::random::RandomGenerator;
use crate::errors::{Result, VaultError};

/// Length of a symmetric key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// A 32-byte key that is wiped from memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct KeyMaterial {
    bytes: [u8; KEY_LEN],
}

impl KeyMaterial {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Decode and validate a base64 key argument.
    ///
    /// Checks run in a fixed order: absent, empty, not base64, wrong length.
    pub fn from_base64(key: Option<&str>) -> Result<Self> {
        let key = key.ok_or(VaultError::MissingArgument("key"))?;
        if key.is_empty() {
            return Err(VaultError::InvalidArgument("key cannot be empty".into()));
        }

        let decoded = Zeroizing::new(
            BASE64
                .decode(key)
                .map_err(|_| VaultError::InvalidArgument("key is not valid base64".into()))?,
        );

        let bytes: [u8; KEY_LEN] = decoded.as_slice().try_into().map_err(|_| {
            VaultError::InvalidArgument(format!(
                "key must be exactly {KEY_LEN} bytes, got {}",
                decoded.len()
            ))
        })?;

        Ok(Self { bytes })
    }

    /// Generate a fresh random key.
    pub fn generate(rng: &RandomGenerator) -> Result<Self> {
        let mut bytes = [0u8; KEY_LEN];
        rng.fill(&mut bytes)?;
        Ok(Self { bytes })
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Encode the key for the API boundary.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.bytes)
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyMaterial([REDACTED])")
    }
}
