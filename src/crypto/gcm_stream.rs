//! Incremental AES-256-GCM over the RustCrypto block primitives.
//!
//! GCM is computed by hand from its parts so that encryption runs in
//! constant memory: CTR keystream (`ctr`, 32-bit big-endian counter
//! starting at `nonce || 2`) and GHASH (`ghash`) over the ciphertext,
//! with the tag masked by `E(K, nonce || 1)`.  The output is identical to
//! the one-shot backends in `aead`.
//!
//! Decryption streams ciphertext through GHASH and CTR as it arrives but
//! withholds all plaintext until the tag has been verified.

use std::sync::Arc;

use aes::cipher::{BlockEncrypt, KeyInit, KeyIvInit, StreamCipher as KeystreamCipher};
use aes::Aes256;
use async_trait::async_trait;
use ghash::universal_hash::UniversalHash;
use ghash::GHash;
use subtle::ConstantTimeEq;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

use crate::crypto::aead::{
    fresh_nonce, nonce_read_error, tag_too_short_error, AeadBackend, NONCE_LEN, TAG_LEN,
};
use crate::crypto::keys::KeyMaterial;
use crate::crypto::random::RandomGenerator;
use crate::crypto::stream::{check_cancelled, commit_output, read_full, StreamCipher, CHUNK_SIZE};
use crate::errors::{Result, VaultError};

type Aes256Ctr = ctr::Ctr32BE<Aes256>;

const BLOCK_LEN: usize = 16;

/// Running GCM state for one message with empty associated data.
struct GcmState {
    keystream: Aes256Ctr,
    ghash: GHash,
    /// Ciphertext bytes not yet forming a full GHASH block.
    partial: Vec<u8>,
    ciphertext_len: u64,
    tag_mask: [u8; TAG_LEN],
}

impl GcmState {
    fn new(key: &KeyMaterial, nonce: &[u8; NONCE_LEN]) -> Result<Self> {
        let block_cipher = Aes256::new_from_slice(key.as_bytes())
            .map_err(|e| VaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

        // H = E(K, 0^128)
        let mut hash_key = ghash::Block::default();
        block_cipher.encrypt_block(&mut hash_key);
        let ghash = GHash::new(&hash_key);

        // J0 = nonce || 0x00000001
        let mut counter = [0u8; BLOCK_LEN];
        counter[..NONCE_LEN].copy_from_slice(nonce);
        counter[BLOCK_LEN - 1] = 1;

        let mut mask = ghash::Block::clone_from_slice(&counter);
        block_cipher.encrypt_block(&mut mask);
        let mut tag_mask = [0u8; TAG_LEN];
        tag_mask.copy_from_slice(&mask);

        // Payload keystream starts at inc32(J0).
        counter[BLOCK_LEN - 1] = 2;
        let keystream = Aes256Ctr::new_from_slices(key.as_bytes(), &counter)
            .map_err(|e| VaultError::EncryptionFailed(format!("invalid CTR parameters: {e}")))?;

        Ok(Self {
            keystream,
            ghash,
            partial: Vec::with_capacity(BLOCK_LEN),
            ciphertext_len: 0,
            tag_mask,
        })
    }

    fn apply_keystream(&mut self, data: &mut [u8]) {
        self.keystream.apply_keystream(data);
    }

    /// Feed ciphertext bytes into GHASH.
    fn absorb(&mut self, mut data: &[u8]) {
        self.ciphertext_len += data.len() as u64;

        if !self.partial.is_empty() {
            let take = (BLOCK_LEN - self.partial.len()).min(data.len());
            self.partial.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.partial.len() < BLOCK_LEN {
                return;
            }
            let block = ghash::Block::clone_from_slice(&self.partial);
            self.ghash.update(&[block]);
            self.partial.clear();
        }

        let mut blocks = data.chunks_exact(BLOCK_LEN);
        for chunk in blocks.by_ref() {
            self.ghash.update(&[ghash::Block::clone_from_slice(chunk)]);
        }
        self.partial.extend_from_slice(blocks.remainder());
    }

    fn finalize(mut self) -> [u8; TAG_LEN] {
        if !self.partial.is_empty() {
            self.ghash.update_padded(&self.partial);
        }

        // len(A) = 0 || len(C), both in bits.
        let mut lengths = [0u8; BLOCK_LEN];
        lengths[8..].copy_from_slice(&(self.ciphertext_len * 8).to_be_bytes());
        self.ghash.update(&[ghash::Block::clone_from_slice(&lengths)]);

        let digest = self.ghash.finalize();
        let mut tag = [0u8; TAG_LEN];
        for (i, byte) in tag.iter_mut().enumerate() {
            *byte = digest[i] ^ self.tag_mask[i];
        }
        tag
    }
}

/// AES-256-GCM computed incrementally, wire-compatible with the other backends.
pub struct StreamingGcmCipher {
    rng: Arc<RandomGenerator>,
}

impl StreamingGcmCipher {
    pub fn new(rng: Arc<RandomGenerator>) -> Self {
        Self { rng }
    }
}

#[async_trait]
impl StreamCipher for StreamingGcmCipher {
    fn name(&self) -> &'static str {
        AeadBackend::Streaming.as_str()
    }

    async fn encrypt(
        &self,
        input: &mut (dyn AsyncRead + Unpin + Send),
        output: &mut (dyn AsyncWrite + Unpin + Send),
        key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let key = KeyMaterial::from_base64(key)?;
        let nonce = fresh_nonce(&self.rng)?;
        let mut state = GcmState::new(&key, &nonce)?;

        output.write_all(&nonce).await?;
        let mut written = NONCE_LEN as u64;

        let mut chunk = Zeroizing::new(vec![0u8; CHUNK_SIZE]);
        loop {
            check_cancelled(cancel)?;
            let n = input.read(&mut chunk[..]).await?;
            if n == 0 {
                break;
            }
            let data = &mut chunk[..n];
            state.apply_keystream(data);
            state.absorb(data);
            output.write_all(data).await?;
            written += n as u64;
        }

        let tag = state.finalize();
        output.write_all(&tag).await?;
        output.flush().await?;
        Ok(written + TAG_LEN as u64)
    }

    async fn decrypt(
        &self,
        input: &mut (dyn AsyncRead + Unpin + Send),
        output: &mut (dyn AsyncWrite + Unpin + Send),
        key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let key = KeyMaterial::from_base64(key)?;

        let mut nonce = [0u8; NONCE_LEN];
        let got = read_full(input, &mut nonce, cancel).await?;
        if got < NONCE_LEN {
            return Err(nonce_read_error(got));
        }
        let mut state = GcmState::new(&key, &nonce)?;

        // The last TAG_LEN bytes seen so far might be the tag, so they are
        // held back until the stream ends.
        let mut pending: Vec<u8> = Vec::with_capacity(CHUNK_SIZE + TAG_LEN);
        let mut plaintext = Zeroizing::new(Vec::new());
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            check_cancelled(cancel)?;
            let n = input.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            pending.extend_from_slice(&chunk[..n]);
            if pending.len() > TAG_LEN {
                let ready = pending.len() - TAG_LEN;
                let mut block: Vec<u8> = pending.drain(..ready).collect();
                state.absorb(&block);
                state.apply_keystream(&mut block);
                plaintext.extend_from_slice(&block);
                zeroize::Zeroize::zeroize(&mut block);
            }
        }

        if pending.len() < TAG_LEN {
            return Err(tag_too_short_error(pending.len()));
        }

        let expected = state.finalize();
        if !bool::from(expected.as_slice().ct_eq(pending.as_slice())) {
            return Err(VaultError::TamperDetected);
        }

        commit_output(output, &[plaintext.as_slice()], cancel).await
    }
}
