//! The key derivation service.
//!
//! Turns a `Passphrase` and a base64 salt into base64 key bytes.  Derivation
//! is CPU-bound, so it runs on tokio's blocking pool and is raced against
//! the caller's cancellation token.

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use zeroize::Zeroizing;

use super::algorithm::{KdfAlgorithm, PreparedKdf};
use super::options::KdfOptions;
use super::passphrase::Passphrase;
use crate::crypto::random::RandomGenerator;
use crate::crypto::stream::check_cancelled;
use crate::errors::{Result, VaultError};

/// Characters used for the synthetic benchmark passphrase.
const BENCH_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Timing samples for one algorithm.
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub algorithm: KdfAlgorithm,
    /// Name of the options preset that was measured.
    pub preset: String,
    /// One entry per derivation, in run order.
    pub samples: Vec<Duration>,
}

impl BenchmarkResult {
    pub fn mean(&self) -> Duration {
        match u32::try_from(self.samples.len()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.samples.iter().sum::<Duration>() / n,
        }
    }

    pub fn min(&self) -> Duration {
        self.samples.iter().min().copied().unwrap_or_default()
    }

    pub fn max(&self) -> Duration {
        self.samples.iter().max().copied().unwrap_or_default()
    }
}

/// The per-vault KDF salt: base64 of SHA-256 over the vault id.
pub fn vault_salt(vault_id: &str) -> String {
    BASE64.encode(Sha256::digest(vault_id.as_bytes()))
}

/// Derives keys from passphrases.  Owns a random generator and is
/// released together with it.
#[derive(Debug)]
pub struct KeyDerivationService {
    rng: Arc<RandomGenerator>,
}

impl KeyDerivationService {
    pub fn new(rng: Arc<RandomGenerator>) -> Self {
        Self { rng }
    }

    /// Derive a key with the algorithm's default preset.
    pub async fn derive_key(
        &self,
        algorithm: KdfAlgorithm,
        passphrase: &Passphrase,
        base64_salt: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.derive_key_with_options(
            algorithm,
            passphrase,
            base64_salt,
            &algorithm.default_options(),
            cancel,
        )
        .await
    }

    /// Derive a key with explicit options.  Returns the key as base64.
    pub async fn derive_key_with_options(
        &self,
        algorithm: KdfAlgorithm,
        passphrase: &Passphrase,
        base64_salt: &str,
        options: &KdfOptions,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.ensure_live()?;
        let prepared = algorithm.prepare(options)?;
        let salt = BASE64
            .decode(base64_salt)
            .map_err(|_| VaultError::InvalidArgument("salt is not valid base64".into()))?;

        debug!(%algorithm, preset = options.name(), "deriving key");
        let key = run_derivation(prepared, passphrase.to_zeroizing(), salt, cancel).await?;
        Ok(BASE64.encode(key.as_slice()))
    }

    /// Time `count` derivations of every algorithm with its default preset.
    pub async fn benchmark_all(
        &self,
        count: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<BenchmarkResult>> {
        let presets: Vec<(KdfAlgorithm, KdfOptions)> = KdfAlgorithm::ALL
            .iter()
            .map(|&alg| (alg, alg.default_options()))
            .collect();
        self.benchmark_with(count, &presets, cancel).await
    }

    /// Time `count` derivations of each `(algorithm, options)` pair.
    pub async fn benchmark_with(
        &self,
        count: usize,
        presets: &[(KdfAlgorithm, KdfOptions)],
        cancel: &CancellationToken,
    ) -> Result<Vec<BenchmarkResult>> {
        self.ensure_live()?;

        let passphrase = Passphrase::new(self.rng.next_string(BENCH_ALPHABET, 16)?);
        let salt = self.rng.next_bytes(16)?;

        let mut results = Vec::with_capacity(presets.len());
        for (algorithm, options) in presets {
            let prepared = algorithm.prepare(options)?;
            let mut samples = Vec::with_capacity(count);
            for _ in 0..count {
                let started = Instant::now();
                run_derivation(
                    prepared.clone(),
                    passphrase.to_zeroizing(),
                    salt.clone(),
                    cancel,
                )
                .await?;
                samples.push(started.elapsed());
            }

            let result = BenchmarkResult {
                algorithm: *algorithm,
                preset: options.name().to_string(),
                samples,
            };
            debug!(
                %algorithm,
                preset = %result.preset,
                mean_ms = result.mean().as_millis() as u64,
                "benchmark complete"
            );
            results.push(result);
        }

        Ok(results)
    }

    /// Release the owned random generator.  Later calls fail.
    pub fn release(&self) {
        self.rng.release();
    }

    pub fn is_released(&self) -> bool {
        self.rng.is_released()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.rng.is_released() {
            return Err(VaultError::RandomReleased);
        }
        Ok(())
    }
}

/// Run one derivation on the blocking pool, abandoning it on cancellation.
async fn run_derivation(
    prepared: PreparedKdf,
    secret: Zeroizing<Vec<u8>>,
    salt: Vec<u8>,
    cancel: &CancellationToken,
) -> Result<Zeroizing<Vec<u8>>> {
    check_cancelled(cancel)?;
    let task = tokio::task::spawn_blocking(move || prepared.derive(&secret, &salt));

    tokio::select! {
        _ = cancel.cancelled() => Err(VaultError::Cancelled),
        joined = task => joined.map_err(|e| {
            VaultError::KeyDerivationFailed(format!("derivation task failed: {e}"))
        })?,
    }
}
