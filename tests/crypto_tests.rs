//! Integration tests for the CloudVault cipher services.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use cloudvault::crypto::aead::OVERHEAD;
use cloudvault::crypto::{
    decrypt_bytes, encrypt_bytes, AeadBackend, AesCbcCipher, KeyMaterial, RandomGenerator,
    StreamCipher,
};
use cloudvault::errors::VaultError;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::sync::CancellationToken;

fn rng() -> Arc<RandomGenerator> {
    Arc::new(RandomGenerator::new())
}

fn random_key(rng: &RandomGenerator) -> String {
    KeyMaterial::generate(rng).unwrap().to_base64()
}

fn backends(rng: &Arc<RandomGenerator>) -> Vec<Arc<dyn StreamCipher>> {
    AeadBackend::ALL.iter().map(|b| b.build(rng.clone())).collect()
}

/// Every cipher, AEAD and CBC alike.
fn all_ciphers(rng: &Arc<RandomGenerator>) -> Vec<Arc<dyn StreamCipher>> {
    let mut ciphers = backends(rng);
    ciphers.push(Arc::new(AesCbcCipher::new(rng.clone())));
    ciphers
}

/// Deterministic filler so failures are reproducible.
fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + 7) as u8).collect()
}

// ---------------------------------------------------------------------------
// Cross-implementation compatibility
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_backend_pair_is_wire_compatible() {
    let rng = rng();
    let key = random_key(&rng);
    let cancel = CancellationToken::new();
    let ciphers = backends(&rng);

    for len in [0usize, 1, 15, 16, 17, 4096, 64 * 1024 + 3, 3 * 1024 * 1024 + 11] {
        let plaintext = payload(len);
        for a in &ciphers {
            let sealed = encrypt_bytes(a.as_ref(), &plaintext, Some(&key), &cancel)
                .await
                .unwrap();
            assert_eq!(sealed.len(), plaintext.len() + OVERHEAD, "{} len {len}", a.name());

            for b in &ciphers {
                let opened = decrypt_bytes(b.as_ref(), &sealed, Some(&key), &cancel)
                    .await
                    .unwrap_or_else(|e| panic!("{} -> {} at {len}: {e}", a.name(), b.name()));
                assert_eq!(opened, plaintext, "{} -> {} at {len}", a.name(), b.name());
            }
        }
    }
}

#[tokio::test]
async fn streaming_backend_handles_files() {
    let rng = rng();
    let key = random_key(&rng);
    let cancel = CancellationToken::new();
    let dir = tempfile::tempdir().unwrap();

    let plain_path = dir.path().join("plain.bin");
    let sealed_path = dir.path().join("sealed.bin");
    let plaintext = payload(2 * 1024 * 1024 + 5);
    std::fs::write(&plain_path, &plaintext).unwrap();

    let streaming = AeadBackend::Streaming.build(rng.clone());
    let mut input = tokio::fs::File::open(&plain_path).await.unwrap();
    let mut output = tokio::fs::File::create(&sealed_path).await.unwrap();
    let written = streaming
        .encrypt(&mut input, &mut output, Some(&key), &cancel)
        .await
        .unwrap();
    drop(output);
    assert_eq!(written as usize, plaintext.len() + OVERHEAD);

    let sealed = std::fs::read(&sealed_path).unwrap();
    let ring = AeadBackend::Ring.build(rng);
    let opened = decrypt_bytes(ring.as_ref(), &sealed, Some(&key), &cancel)
        .await
        .unwrap();
    assert_eq!(opened, plaintext);
}

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn any_single_bit_flip_is_detected() {
    let rng = rng();
    let key = random_key(&rng);
    let cancel = CancellationToken::new();

    for cipher in backends(&rng) {
        let sealed = encrypt_bytes(cipher.as_ref(), b"top secret value", Some(&key), &cancel)
            .await
            .unwrap();
        for byte in 0..sealed.len() {
            for bit in 0..8 {
                let mut tampered = sealed.clone();
                tampered[byte] ^= 1 << bit;
                let result = decrypt_bytes(cipher.as_ref(), &tampered, Some(&key), &cancel).await;
                assert!(
                    matches!(result, Err(VaultError::TamperDetected)),
                    "{}: flip at byte {byte} bit {bit} not detected",
                    cipher.name()
                );
            }
        }
    }
}

#[tokio::test]
async fn wrong_key_is_rejected_by_every_backend() {
    let rng = rng();
    let cancel = CancellationToken::new();
    let right = random_key(&rng);
    let wrong = random_key(&rng);

    for cipher in backends(&rng) {
        let sealed = encrypt_bytes(cipher.as_ref(), b"hello", Some(&right), &cancel)
            .await
            .unwrap();
        let result = decrypt_bytes(cipher.as_ref(), &sealed, Some(&wrong), &cancel).await;
        assert!(matches!(result, Err(VaultError::TamperDetected)), "{}", cipher.name());
    }
}

// ---------------------------------------------------------------------------
// Framing and validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_plaintext_seals_to_exactly_28_bytes() {
    let rng = rng();
    let key = random_key(&rng);
    let cancel = CancellationToken::new();

    for cipher in backends(&rng) {
        let sealed = encrypt_bytes(cipher.as_ref(), b"", Some(&key), &cancel)
            .await
            .unwrap();
        assert_eq!(sealed.len(), 28);
        let opened = decrypt_bytes(cipher.as_ref(), &sealed, Some(&key), &cancel)
            .await
            .unwrap();
        assert!(opened.is_empty());
    }
}

#[tokio::test]
async fn five_byte_stream_reports_short_nonce() {
    let rng = rng();
    let key = random_key(&rng);
    let cancel = CancellationToken::new();

    for cipher in backends(&rng) {
        let err = decrypt_bytes(cipher.as_ref(), &[1, 2, 3, 4, 5], Some(&key), &cancel)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to read nonce from input stream. Expected 12 bytes but got 5."
        );
    }
}

#[tokio::test]
async fn missing_tag_is_distinct_from_tampering() {
    let rng = rng();
    let key = random_key(&rng);
    let cancel = CancellationToken::new();

    for cipher in backends(&rng) {
        let result = decrypt_bytes(cipher.as_ref(), &[0u8; 12 + 15], Some(&key), &cancel).await;
        assert!(
            matches!(result, Err(VaultError::CiphertextTooShort { expected: 16, actual: 15 })),
            "{}",
            cipher.name()
        );
    }
}

#[tokio::test]
async fn key_is_validated_before_any_io() {
    let rng = rng();
    let cancel = CancellationToken::new();
    let short_key = base64_of(&[0u8; 16]);

    for cipher in backends(&rng) {
        assert!(matches!(
            encrypt_bytes(cipher.as_ref(), b"x", None, &cancel).await,
            Err(VaultError::MissingArgument("key"))
        ));
        assert!(matches!(
            encrypt_bytes(cipher.as_ref(), b"x", Some(""), &cancel).await,
            Err(VaultError::InvalidArgument(_))
        ));
        assert!(matches!(
            decrypt_bytes(cipher.as_ref(), b"", Some("not base64!"), &cancel).await,
            Err(VaultError::InvalidArgument(_))
        ));
        assert!(matches!(
            decrypt_bytes(cipher.as_ref(), b"", Some(&short_key), &cancel).await,
            Err(VaultError::InvalidArgument(_))
        ));
    }
}

#[tokio::test]
async fn cancelled_token_stops_encryption() {
    let rng = rng();
    let key = random_key(&rng);
    let cancel = CancellationToken::new();
    cancel.cancel();

    for cipher in backends(&rng) {
        let result = encrypt_bytes(cipher.as_ref(), &payload(1024), Some(&key), &cancel).await;
        assert!(matches!(result, Err(VaultError::Cancelled)), "{}", cipher.name());
    }
}

/// Output sink that cancels `token` as soon as anything is written to it.
struct CancelOnWrite {
    written: Vec<u8>,
    token: CancellationToken,
}

impl AsyncWrite for CancelOnWrite {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.token.cancel();
        self.written.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Input source that cancels `token` on its first read.
struct CancelOnRead<'a> {
    inner: &'a [u8],
    token: CancellationToken,
}

impl AsyncRead for CancelOnRead<'_> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        self.token.cancel();
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

#[tokio::test]
async fn cancel_during_plaintext_write_still_delivers_everything() {
    let rng = rng();
    let key = random_key(&rng);
    let plaintext = payload(200 * 1024);

    for cipher in all_ciphers(&rng) {
        let sealed = encrypt_bytes(cipher.as_ref(), &plaintext, Some(&key), &CancellationToken::new())
            .await
            .unwrap();

        let token = CancellationToken::new();
        let mut out = CancelOnWrite {
            written: Vec::new(),
            token: token.clone(),
        };
        let mut input = sealed.as_slice();
        let n = cipher
            .decrypt(&mut input, &mut out, Some(&key), &token)
            .await
            .unwrap_or_else(|e| panic!("{}: {e}", cipher.name()));

        assert!(token.is_cancelled());
        assert_eq!(n as usize, plaintext.len(), "{}", cipher.name());
        assert_eq!(out.written, plaintext, "{}", cipher.name());
    }
}

#[tokio::test]
async fn cancel_while_reading_ciphertext_writes_nothing() {
    let rng = rng();
    let key = random_key(&rng);
    let plaintext = payload(200 * 1024);

    for cipher in all_ciphers(&rng) {
        let sealed = encrypt_bytes(cipher.as_ref(), &plaintext, Some(&key), &CancellationToken::new())
            .await
            .unwrap();

        let token = CancellationToken::new();
        let mut input = CancelOnRead {
            inner: &sealed,
            token: token.clone(),
        };
        let mut out = Vec::new();
        let result = cipher.decrypt(&mut input, &mut out, Some(&key), &token).await;

        assert!(matches!(result, Err(VaultError::Cancelled)), "{}", cipher.name());
        assert!(out.is_empty(), "{}", cipher.name());
    }
}

#[tokio::test]
async fn cancel_during_encryption_never_leaves_a_decryptable_fragment() {
    let rng = rng();
    let key = random_key(&rng);
    let plaintext = payload(200 * 1024);

    for cipher in all_ciphers(&rng) {
        let token = CancellationToken::new();
        let mut out = CancelOnWrite {
            written: Vec::new(),
            token: token.clone(),
        };
        let mut input = plaintext.as_slice();
        let result = cipher.encrypt(&mut input, &mut out, Some(&key), &token).await;
        let fresh = CancellationToken::new();

        match result {
            // Buffered ciphers commit the whole sealed stream at once.
            Ok(n) => {
                assert_eq!(n as usize, out.written.len(), "{}", cipher.name());
                let opened = decrypt_bytes(cipher.as_ref(), &out.written, Some(&key), &fresh)
                    .await
                    .unwrap();
                assert_eq!(opened, plaintext, "{}", cipher.name());
            }
            // Streaming ciphers stop between chunks, before the tag or final block.
            Err(VaultError::Cancelled) => {
                assert!(out.written.len() < plaintext.len(), "{}", cipher.name());
                assert!(
                    decrypt_bytes(cipher.as_ref(), &out.written, Some(&key), &fresh)
                        .await
                        .is_err(),
                    "{}",
                    cipher.name()
                );
            }
            Err(e) => panic!("{}: unexpected error {e}", cipher.name()),
        }
    }
}

// ---------------------------------------------------------------------------
// CBC
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cbc_round_trip_and_framing() {
    let rng = rng();
    let key = random_key(&rng);
    let cancel = CancellationToken::new();
    let cbc = AesCbcCipher::new(rng.clone());

    for len in [0usize, 1, 16, 100 * 1024 + 1] {
        let plaintext = payload(len);
        let sealed = encrypt_bytes(&cbc, &plaintext, Some(&key), &cancel)
            .await
            .unwrap();
        // IV plus plaintext padded up to the next full block.
        assert_eq!(sealed.len(), 16 + (len / 16 + 1) * 16);
        let opened = decrypt_bytes(&cbc, &sealed, Some(&key), &cancel)
            .await
            .unwrap();
        assert_eq!(opened, plaintext);
    }
}

#[tokio::test]
async fn cbc_short_iv_reports_byte_counts() {
    let rng = rng();
    let key = random_key(&rng);
    let cbc = AesCbcCipher::new(rng.clone());

    let err = decrypt_bytes(&cbc, &[0u8; 9], Some(&key), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to read IV from input stream. Expected 16 bytes but got 9."
    );
}

fn base64_of(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
