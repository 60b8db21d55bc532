//! Supported key-derivation algorithms.
//!
//! - **PBKDF2**: iterated HMAC (`ring::pbkdf2`) with a configurable hash.
//! - **Argon2id**: memory-hard KDF (`argon2`), resistant to GPU attacks.
//!
//! Options are resolved into a `PreparedKdf` before any derivation runs,
//! so a missing or mistyped option never costs a full derivation.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use argon2::{Algorithm, Argon2, Params, Version};
use ring::pbkdf2;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::options::{KdfOptions, HASH, ITERATIONS, LENGTH, MEMORY_KIB, PARALLELISM, TIME_COST};
use crate::errors::{Result, VaultError};

/// Minimum safe Argon2 memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Longest output any algorithm will produce.
const MAX_OUTPUT_LEN: u32 = 1_024;

/// A key-derivation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KdfAlgorithm {
    Pbkdf2,
    Argon2id,
}

impl KdfAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [KdfAlgorithm; 2] = [Self::Pbkdf2, Self::Argon2id];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pbkdf2 => "pbkdf2",
            Self::Argon2id => "argon2id",
        }
    }

    /// The production preset for this algorithm.
    pub fn default_options(self) -> KdfOptions {
        match self {
            Self::Pbkdf2 => KdfOptions::pbkdf2_default(),
            Self::Argon2id => KdfOptions::argon2id_default(),
        }
    }

    /// The reduced-cost preset, for automated tests only.
    pub fn test_options(self) -> KdfOptions {
        match self {
            Self::Pbkdf2 => KdfOptions::pbkdf2_test(),
            Self::Argon2id => KdfOptions::argon2id_test(),
        }
    }

    /// Resolve and validate `options` for this algorithm.
    pub fn prepare(self, options: &KdfOptions) -> Result<PreparedKdf> {
        let length = options.get_as_u32(LENGTH, 1)?;
        if length > MAX_OUTPUT_LEN {
            return Err(VaultError::KeyDerivationFailed(format!(
                "output length must be at most {MAX_OUTPUT_LEN} bytes (got {length})"
            )));
        }

        match self {
            Self::Pbkdf2 => {
                let iterations = options.get_as_u32(ITERATIONS, 1)?;
                let hash = parse_hash(options.get_as_string(HASH)?)?;
                Ok(PreparedKdf::Pbkdf2 {
                    hash,
                    iterations: NonZeroU32::new(iterations).ok_or_else(|| {
                        VaultError::KeyDerivationFailed("iterations must be at least 1".into())
                    })?,
                    length: length as usize,
                })
            }
            Self::Argon2id => {
                let memory_kib = options.get_as_u32(MEMORY_KIB, MIN_MEMORY_KIB)?;
                let time_cost = options.get_as_u32(TIME_COST, 1)?;
                let parallelism = options.get_as_u32(PARALLELISM, 1)?;

                let params = Params::new(memory_kib, time_cost, parallelism, Some(length as usize))
                    .map_err(|e| {
                        VaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}"))
                    })?;
                Ok(PreparedKdf::Argon2id { params })
            }
        }
    }
}

impl fmt::Display for KdfAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KdfAlgorithm {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pbkdf2" => Ok(Self::Pbkdf2),
            "argon2id" | "argon2" => Ok(Self::Argon2id),
            other => Err(VaultError::UnknownAlgorithm(other.to_string())),
        }
    }
}

fn parse_hash(name: &str) -> Result<pbkdf2::Algorithm> {
    match name.to_uppercase().replace('-', "").as_str() {
        "SHA1" => Ok(pbkdf2::PBKDF2_HMAC_SHA1),
        "SHA256" => Ok(pbkdf2::PBKDF2_HMAC_SHA256),
        "SHA384" => Ok(pbkdf2::PBKDF2_HMAC_SHA384),
        "SHA512" => Ok(pbkdf2::PBKDF2_HMAC_SHA512),
        _ => Err(VaultError::KeyDerivationFailed(format!(
            "unsupported PBKDF2 hash '{name}' (supported: SHA1, SHA256, SHA384, SHA512)"
        ))),
    }
}

/// Validated derivation parameters, ready to run.
#[derive(Clone)]
pub enum PreparedKdf {
    Pbkdf2 {
        hash: pbkdf2::Algorithm,
        iterations: NonZeroU32,
        length: usize,
    },
    Argon2id {
        params: Params,
    },
}

impl PreparedKdf {
    /// Number of bytes `derive` will produce.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Pbkdf2 { length, .. } => *length,
            Self::Argon2id { params } => params.output_len().unwrap_or(Params::DEFAULT_OUTPUT_LEN),
        }
    }

    /// Derive key bytes.  CPU-bound; callers run this off the async executor.
    ///
    /// The same secret + salt + parameters always produce the same bytes.
    pub fn derive(&self, secret: &[u8], salt: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let mut out = Zeroizing::new(vec![0u8; self.output_len()]);
        match self {
            Self::Pbkdf2 {
                hash, iterations, ..
            } => {
                pbkdf2::derive(*hash, *iterations, salt, secret, out.as_mut_slice());
            }
            Self::Argon2id { params } => {
                let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone());
                argon2
                    .hash_password_into(secret, salt, out.as_mut_slice())
                    .map_err(|e| {
                        VaultError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}"))
                    })?;
            }
        }
        Ok(out)
    }
}

impl fmt::Debug for PreparedKdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pbkdf2 {
                iterations, length, ..
            } => f
                .debug_struct("Pbkdf2")
                .field("iterations", iterations)
                .field("length", length)
                .finish(),
            Self::Argon2id { params } => f.debug_struct("Argon2id").field("params", params).finish(),
        }
    }
}
