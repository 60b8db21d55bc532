//! The stream cipher capability shared by every cipher backend.
//!
//! Ciphers read from an `AsyncRead` and write to an `AsyncWrite`, so the
//! caller never has to hold a whole payload in memory.  Read loops poll
//! the cancellation token between chunks; once a result is committed to
//! the output it is written in full.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::errors::{Result, VaultError};

/// Size of the read/write chunks used by every cipher loop.
pub(crate) const CHUNK_SIZE: usize = 64 * 1024;

/// Symmetric encryption over byte streams.
///
/// `key` is the base64 encoding of a 32-byte key.  `None` models an absent
/// argument and fails with `MissingArgument` before any I/O happens.
/// Both operations return the number of bytes written to `output`.
#[async_trait]
pub trait StreamCipher: Send + Sync {
    /// Short, stable name of this backend (used in logs and tests).
    fn name(&self) -> &'static str;

    async fn encrypt(
        &self,
        input: &mut (dyn AsyncRead + Unpin + Send),
        output: &mut (dyn AsyncWrite + Unpin + Send),
        key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<u64>;

    async fn decrypt(
        &self,
        input: &mut (dyn AsyncRead + Unpin + Send),
        output: &mut (dyn AsyncWrite + Unpin + Send),
        key: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<u64>;
}

/// Encrypt an in-memory buffer with any `StreamCipher`.
pub async fn encrypt_bytes(
    cipher: &dyn StreamCipher,
    plaintext: &[u8],
    key: Option<&str>,
    cancel: &CancellationToken,
) -> Result<Vec<u8>> {
    let mut input = plaintext;
    let mut output = Vec::with_capacity(plaintext.len() + 32);
    cipher.encrypt(&mut input, &mut output, key, cancel).await?;
    Ok(output)
}

/// Decrypt an in-memory buffer with any `StreamCipher`.
pub async fn decrypt_bytes(
    cipher: &dyn StreamCipher,
    ciphertext: &[u8],
    key: Option<&str>,
    cancel: &CancellationToken,
) -> Result<Vec<u8>> {
    let mut input = ciphertext;
    let mut output = Vec::with_capacity(ciphertext.len());
    cipher.decrypt(&mut input, &mut output, key, cancel).await?;
    Ok(output)
}

pub(crate) fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(VaultError::Cancelled);
    }
    Ok(())
}

/// Read until `buf` is full or the stream ends.  Returns the bytes read.
pub(crate) async fn read_full(
    input: &mut (dyn AsyncRead + Unpin + Send),
    buf: &mut [u8],
    cancel: &CancellationToken,
) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        check_cancelled(cancel)?;
        let n = input.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Drain the rest of `input` into memory.
pub(crate) async fn read_remaining(
    input: &mut (dyn AsyncRead + Unpin + Send),
    cancel: &CancellationToken,
) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        check_cancelled(cancel)?;
        let n = input.read(&mut chunk).await?;
        if n == 0 {
            return Ok(data);
        }
        data.extend_from_slice(&chunk[..n]);
    }
}

/// Check the token one last time, then write every part and flush.
///
/// Cancellation is not observed after the first byte goes out, so the
/// caller sees either nothing or the complete result.
pub(crate) async fn commit_output(
    output: &mut (dyn AsyncWrite + Unpin + Send),
    parts: &[&[u8]],
    cancel: &CancellationToken,
) -> Result<u64> {
    check_cancelled(cancel)?;
    let mut written = 0u64;
    for part in parts {
        output.write_all(part).await?;
        written += part.len() as u64;
    }
    output.flush().await?;
    Ok(written)
}
