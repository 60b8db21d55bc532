//! AES-256-GCM authenticated stream encryption.
//!
//! Every backend in this module produces and consumes the same layout:
//!
//! ```text
//! [ 12-byte nonce | ciphertext (N bytes) | 16-byte auth tag ]
//! ```
//!
//! A fresh nonce is drawn from the `RandomGenerator` on every `encrypt`.
//! Backends are interchangeable: ciphertext from one decrypts with any
//! other.  They differ only in the library doing the work and in how much
//! of the payload they hold in memory.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use async_trait::async_trait;
use ring::aead::{Aad, LessSafeKey, UnboundKey, AES_256_GCM};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

use crate::crypto::gcm_stream::StreamingGcmCipher;
use crate::crypto::keys::KeyMaterial;
use crate::crypto::random::RandomGenerator;
use crate::crypto::stream::{commit_output, read_full, read_remaining, StreamCipher};
use crate::errors::{Result, VaultError};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Fixed framing overhead of one sealed stream.
pub const OVERHEAD: usize = NONCE_LEN + TAG_LEN;

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

/// The available AEAD implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AeadBackend {
    /// RustCrypto `aes-gcm`; buffers the payload.
    #[default]
    AesGcm,
    /// `ring`; buffers the payload.
    Ring,
    /// Incremental GCM over RustCrypto primitives; constant memory on encrypt.
    Streaming,
}

impl AeadBackend {
    /// Every backend, in a stable order.
    pub const ALL: [AeadBackend; 3] = [Self::AesGcm, Self::Ring, Self::Streaming];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AesGcm => "aes-gcm",
            Self::Ring => "ring",
            Self::Streaming => "streaming",
        }
    }

    /// Instantiate the backend, sharing the given random source for nonces.
    pub fn build(self, rng: Arc<RandomGenerator>) -> Arc<dyn StreamCipher> {
        match self {
            Self::AesGcm => Arc::new(AesGcmCipher::new(rng)),
            Self::Ring => Arc::new(RingCipher::new(rng)),
            Self::Streaming => Arc::new(StreamingGcmCipher::new(rng)),
        }
    }
}

impl fmt::Display for AeadBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AeadBackend {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "aes-gcm" | "aesgcm" => Ok(Self::AesGcm),
            "ring" => Ok(Self::Ring),
            "streaming" => Ok(Self::Streaming),
            other => Err(VaultError::InvalidArgument(format!(
                "unknown AEAD backend '{other}' (supported: aes-gcm, ring, streaming)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared framing helpers
// ---------------------------------------------------------------------------

pub(crate) fn nonce_read_error(actual: usize) -> VaultError {
    VaultError::MalformedInput(format!(
        "Failed to read nonce from input stream. Expected {NONCE_LEN} bytes but got {actual}."
    ))
}

pub(crate) fn tag_too_short_error(actual: usize) -> VaultError {
    VaultError::CiphertextTooShort {
        expected: TAG_LEN,
        actual,
    }
}

pub(crate) fn fresh_nonce(rng: &RandomGenerator) -> Result<[u8; NONCE_LEN]> {
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill(&mut nonce)?;
    Ok(nonce)
}

/// A fully buffered sealed stream: nonce, ciphertext, tag.
struct Sealed {
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
    tag: [u8; TAG_LEN],
}

/// Read and frame-check a whole sealed stream.
async fn read_sealed(
    input: &mut (dyn AsyncRead + Unpin + Send),
    cancel: &CancellationToken,
) -> Result<Sealed> {
    let mut nonce = [0u8; NONCE_LEN];
    let got = read_full(input, &mut nonce, cancel).await?;
    if got < NONCE_LEN {
        return Err(nonce_read_error(got));
    }

    let mut ciphertext = read_remaining(input, cancel).await?;
    if ciphertext.len() < TAG_LEN {
        return Err(tag_too_short_error(ciphertext.len()));
    }

    let tag_start = ciphertext.len() - TAG_LEN;
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&ciphertext[tag_start..]);
    ciphertext.truncate(tag_start);

    Ok(Sealed {
        nonce,
        ciphertext,
        tag,
    })
}

async fn write_sealed(
    output: &mut (dyn AsyncWrite + Unpin + Send),
    nonce: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    cancel: &CancellationToken,
) -> Result<u64> {
    commit_output(output, &[nonce, ciphertext, tag], cancel).await
}

// ---------------------------------------------------------------------------
// RustCrypto aes-gcm backend
// ---------------------------------------------------------------------------

/// AES-256-GCM via the RustCrypto `aes-gcm` crate.
pub struct AesGcmCipher {
    rng: Arc<RandomGenerator>,
}

impl AesGcmCipher {
    pub fn new(rng: Arc<RandomGenerator>) -> Self {
        Self { rng }
    }
}

#[async_trait]
impl StreamCipher for AesGcmCipher {
    fn name(&self) -> &'static str {
        AeadBackend::AesGcm.as_str()
    }

    async fn encrypt(
        &self,
        input: &mut (dyn AsyncRead + Unpin + Send),
        output: &mut (dyn AsyncWrite + Unpin + Send),
        key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let key = KeyMaterial::from_base64(key)?;
        let mut buffer = Zeroizing::new(read_remaining(input, cancel).await?);

        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| VaultError::EncryptionFailed(format!("invalid key length: {e}")))?;
        let nonce = fresh_nonce(&self.rng)?;

        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", buffer.as_mut_slice())
            .map_err(|e| VaultError::EncryptionFailed(format!("encryption error: {e}")))?;

        write_sealed(output, &nonce, &buffer, tag.as_slice(), cancel).await
    }

    async fn decrypt(
        &self,
        input: &mut (dyn AsyncRead + Unpin + Send),
        output: &mut (dyn AsyncWrite + Unpin + Send),
        key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let key = KeyMaterial::from_base64(key)?;
        let sealed = read_sealed(input, cancel).await?;

        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| VaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

        let mut plaintext = Zeroizing::new(sealed.ciphertext);
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&sealed.nonce),
                b"",
                plaintext.as_mut_slice(),
                Tag::from_slice(&sealed.tag),
            )
            .map_err(|_| VaultError::TamperDetected)?;

        commit_output(output, &[plaintext.as_slice()], cancel).await
    }
}

// ---------------------------------------------------------------------------
// ring backend
// ---------------------------------------------------------------------------

/// AES-256-GCM via `ring`.
pub struct RingCipher {
    rng: Arc<RandomGenerator>,
}

impl RingCipher {
    pub fn new(rng: Arc<RandomGenerator>) -> Self {
        Self { rng }
    }

    fn sealing_key(key: &KeyMaterial) -> Result<LessSafeKey> {
        let unbound = UnboundKey::new(&AES_256_GCM, key.as_bytes()).map_err(|_| {
            VaultError::EncryptionFailed("failed to create AES-256-GCM key".to_string())
        })?;
        Ok(LessSafeKey::new(unbound))
    }
}

#[async_trait]
impl StreamCipher for RingCipher {
    fn name(&self) -> &'static str {
        AeadBackend::Ring.as_str()
    }

    async fn encrypt(
        &self,
        input: &mut (dyn AsyncRead + Unpin + Send),
        output: &mut (dyn AsyncWrite + Unpin + Send),
        key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let key = KeyMaterial::from_base64(key)?;
        let mut buffer = Zeroizing::new(read_remaining(input, cancel).await?);

        let sealing_key = Self::sealing_key(&key)?;
        let nonce = fresh_nonce(&self.rng)?;

        let tag = sealing_key
            .seal_in_place_separate_tag(
                ring::aead::Nonce::assume_unique_for_key(nonce),
                Aad::empty(),
                buffer.as_mut_slice(),
            )
            .map_err(|_| VaultError::EncryptionFailed("AES-256-GCM encryption failed".into()))?;

        write_sealed(output, &nonce, &buffer, tag.as_ref(), cancel).await
    }

    async fn decrypt(
        &self,
        input: &mut (dyn AsyncRead + Unpin + Send),
        output: &mut (dyn AsyncWrite + Unpin + Send),
        key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let key = KeyMaterial::from_base64(key)?;
        let sealed = read_sealed(input, cancel).await?;
        let opening_key = Self::sealing_key(&key)?;

        // ring expects the tag appended to the ciphertext.
        let mut in_out = Zeroizing::new(sealed.ciphertext);
        in_out.extend_from_slice(&sealed.tag);

        let plaintext = opening_key
            .open_in_place(
                ring::aead::Nonce::assume_unique_for_key(sealed.nonce),
                Aad::empty(),
                in_out.as_mut_slice(),
            )
            .map_err(|_| VaultError::TamperDetected)?;

        commit_output(output, &[&*plaintext], cancel).await
    }
}
