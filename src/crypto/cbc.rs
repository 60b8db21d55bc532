//! AES-256-CBC stream encryption with PKCS#7 padding.
//!
//! Layout: `[ 16-byte IV | PKCS#7-padded ciphertext ]`.
//!
//! This mode provides confidentiality only.  There is no authentication
//! tag, so a wrong key shows up as a padding failure at best, and a
//! tampered ciphertext may decrypt to garbage without any error.  Use the
//! `aead` backends wherever tampering must be detected.

use std::sync::Arc;

use aes::Aes256;
use async_trait::async_trait;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

use crate::crypto::keys::KeyMaterial;
use crate::crypto::random::RandomGenerator;
use crate::crypto::stream::{check_cancelled, commit_output, read_full, StreamCipher, CHUNK_SIZE};
use crate::errors::{Result, VaultError};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Size of the CBC initialization vector (one AES block).
pub const IV_LEN: usize = 16;

const BLOCK_LEN: usize = 16;

/// AES-256-CBC with PKCS#7 padding.
pub struct AesCbcCipher {
    rng: Arc<RandomGenerator>,
}

impl AesCbcCipher {
    pub fn new(rng: Arc<RandomGenerator>) -> Self {
        Self { rng }
    }
}

fn encrypt_blocks(encryptor: &mut Aes256CbcEnc, data: &mut [u8]) {
    for block in data.chunks_exact_mut(BLOCK_LEN) {
        encryptor.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

fn decrypt_blocks(decryptor: &mut Aes256CbcDec, data: &mut [u8]) {
    for block in data.chunks_exact_mut(BLOCK_LEN) {
        decryptor.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

/// Length of the PKCS#7 padding on a final decrypted block.
fn padding_len(last_block: &[u8]) -> Result<usize> {
    let pad = usize::from(*last_block.last().ok_or(VaultError::InvalidPadding)?);
    if pad == 0 || pad > BLOCK_LEN {
        return Err(VaultError::InvalidPadding);
    }
    if !last_block[BLOCK_LEN - pad..]
        .iter()
        .all(|&b| usize::from(b) == pad)
    {
        return Err(VaultError::InvalidPadding);
    }
    Ok(pad)
}

#[async_trait]
impl StreamCipher for AesCbcCipher {
    fn name(&self) -> &'static str {
        "aes-cbc"
    }

    async fn encrypt(
        &self,
        input: &mut (dyn AsyncRead + Unpin + Send),
        output: &mut (dyn AsyncWrite + Unpin + Send),
        key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let key = KeyMaterial::from_base64(key)?;
        let mut iv = [0u8; IV_LEN];
        self.rng.fill(&mut iv)?;
        let mut encryptor = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
            .map_err(|e| VaultError::EncryptionFailed(format!("invalid CBC parameters: {e}")))?;

        output.write_all(&iv).await?;
        let mut written = IV_LEN as u64;

        let mut pending = Zeroizing::new(Vec::with_capacity(CHUNK_SIZE + BLOCK_LEN));
        let mut chunk = Zeroizing::new(vec![0u8; CHUNK_SIZE]);
        loop {
            check_cancelled(cancel)?;
            let n = input.read(&mut chunk[..]).await?;
            if n == 0 {
                break;
            }
            pending.extend_from_slice(&chunk[..n]);

            let full = pending.len() / BLOCK_LEN * BLOCK_LEN;
            encrypt_blocks(&mut encryptor, &mut pending[..full]);
            output.write_all(&pending[..full]).await?;
            written += full as u64;
            pending.drain(..full);
        }

        // PKCS#7 always adds between 1 and 16 bytes.
        let pad = BLOCK_LEN - pending.len();
        pending.resize(BLOCK_LEN, pad as u8);
        encrypt_blocks(&mut encryptor, &mut pending[..]);
        output.write_all(&pending[..]).await?;
        output.flush().await?;

        Ok(written + BLOCK_LEN as u64)
    }

    async fn decrypt(
        &self,
        input: &mut (dyn AsyncRead + Unpin + Send),
        output: &mut (dyn AsyncWrite + Unpin + Send),
        key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let key = KeyMaterial::from_base64(key)?;

        let mut iv = [0u8; IV_LEN];
        let got = read_full(input, &mut iv, cancel).await?;
        if got < IV_LEN {
            return Err(VaultError::MalformedInput(format!(
                "Failed to read IV from input stream. Expected {IV_LEN} bytes but got {got}."
            )));
        }
        let mut decryptor = Aes256CbcDec::new_from_slices(key.as_bytes(), &iv)
            .map_err(|e| VaultError::EncryptionFailed(format!("invalid CBC parameters: {e}")))?;

        // The final block carries the padding, so at least one block is
        // always held back until the stream ends.
        let mut pending: Vec<u8> = Vec::with_capacity(CHUNK_SIZE + BLOCK_LEN);
        let mut plaintext = Zeroizing::new(Vec::new());
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            check_cancelled(cancel)?;
            let n = input.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            pending.extend_from_slice(&chunk[..n]);

            let ready = pending.len().saturating_sub(1) / BLOCK_LEN * BLOCK_LEN;
            if ready > 0 {
                decrypt_blocks(&mut decryptor, &mut pending[..ready]);
                plaintext.extend_from_slice(&pending[..ready]);
                pending.drain(..ready);
            }
        }

        if pending.len() != BLOCK_LEN {
            let body = plaintext.len() + pending.len();
            return Err(VaultError::MalformedInput(format!(
                "Ciphertext length {body} is not a positive multiple of the {BLOCK_LEN}-byte block size."
            )));
        }

        decrypt_blocks(&mut decryptor, &mut pending);
        let pad = padding_len(&pending)?;
        plaintext.extend_from_slice(&pending[..BLOCK_LEN - pad]);
        zeroize::Zeroize::zeroize(&mut pending);

        commit_output(output, &[plaintext.as_slice()], cancel).await
    }
}
