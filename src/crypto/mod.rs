//! Cryptographic primitives for CloudVault.
//!
//! This module provides:
//! - A releasable CSPRNG handle (`random`)
//! - Zeroizing base64 key material (`keys`)
//! - The `StreamCipher` capability and stream helpers (`stream`)
//! - Interchangeable AES-256-GCM backends (`aead`, `gcm_stream`)
//! - Unauthenticated AES-256-CBC (`cbc`)

pub mod aead;
pub mod cbc;
pub mod gcm_stream;
pub mod keys;
pub mod random;
pub mod stream;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{AeadBackend, StreamCipher, RandomGenerator, ...};
pub use aead::{AeadBackend, AesGcmCipher, RingCipher};
pub use cbc::AesCbcCipher;
pub use gcm_stream::StreamingGcmCipher;
pub use keys::{KeyMaterial, KEY_LEN};
pub use random::RandomGenerator;
pub use stream::{decrypt_bytes, encrypt_bytes, StreamCipher};
