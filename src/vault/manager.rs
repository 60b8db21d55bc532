//! Loading and saving whole vaults.
//!
//! ```text
//! save:  Vault -> JSON -> gzip -> AEAD encrypt -> storage put
//! load:  storage get -> AEAD decrypt -> gunzip -> JSON -> Vault
//! ```
//!
//! Both directions run entirely in memory between the storage call and
//! the caller, so a failure at any step leaves no partial result behind.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::model::Vault;
use super::verify::{self, VerifyResults};
use crate::config::Settings;
use crate::crypto::keys::KeyMaterial;
use crate::crypto::random::RandomGenerator;
use crate::crypto::stream::{check_cancelled, decrypt_bytes, encrypt_bytes, StreamCipher};
use crate::errors::{Result, VaultError};
use crate::kdf::{vault_salt, KdfAlgorithm, KdfOptions, KeyDerivationService, Passphrase};
use crate::storage::{CloudStorageProvider, FileSystemTransport};

/// Default gzip level (6 = balanced speed/ratio).
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Progress points reported by `VaultManager::save`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStage {
    Serializing,
    Compressing,
    Encrypting,
    Uploading,
    Complete,
}

/// Callback invoked as `save` moves through its stages.
pub type SaveProgress<'a> = &'a (dyn Fn(SaveStage) + Send + Sync);

/// Composes an AEAD cipher, gzip and a storage provider.
pub struct VaultManager {
    storage: CloudStorageProvider,
    cipher: Arc<dyn StreamCipher>,
    compression: Compression,
}

impl VaultManager {
    pub fn new(storage: CloudStorageProvider, cipher: Arc<dyn StreamCipher>) -> Self {
        Self {
            storage,
            cipher,
            compression: Compression::new(DEFAULT_COMPRESSION_LEVEL),
        }
    }

    /// Build a manager over the project's filesystem store.
    pub fn from_settings(
        settings: &Settings,
        project_dir: &Path,
        rng: Arc<RandomGenerator>,
    ) -> Result<Self> {
        let transport = FileSystemTransport::new(settings.store_path(project_dir));
        let storage = CloudStorageProvider::new(Arc::new(transport), &settings.identity_id)?;
        let cipher = settings.aead_backend.build(rng);
        Ok(Self::new(storage, cipher).with_compression_level(settings.compression_level))
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression = Compression::new(level.min(9));
        self
    }

    pub fn storage(&self) -> &CloudStorageProvider {
        &self.storage
    }

    pub fn cipher_name(&self) -> &'static str {
        self.cipher.name()
    }

    /// Fetch, decrypt and decode the vault `vault_id`.
    pub async fn load(
        &self,
        vault_id: &str,
        base64_key: &str,
        cancel: &CancellationToken,
    ) -> Result<Vault> {
        KeyMaterial::from_base64(Some(base64_key))?;

        let ciphertext = self.storage.get(vault_id, cancel).await?;
        let compressed =
            decrypt_bytes(self.cipher.as_ref(), &ciphertext, Some(base64_key), cancel).await?;
        check_cancelled(cancel)?;

        let json = gunzip(&compressed)?;
        let vault: Vault = serde_json::from_slice(&json)
            .map_err(|e| VaultError::InvalidVaultFormat(format!("vault content is corrupt: {e}")))?;

        if vault.id() != vault_id {
            return Err(VaultError::InvalidVaultFormat(format!(
                "object for vault '{vault_id}' contains vault '{}'",
                vault.id()
            )));
        }

        debug!(vault_id, secrets = vault.len(), cipher = self.cipher.name(), "vault loaded");
        Ok(vault)
    }

    /// Encode, encrypt and upload `vault`, replacing the stored copy.
    pub async fn save(
        &self,
        vault: &Vault,
        base64_key: &str,
        progress: Option<SaveProgress<'_>>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        KeyMaterial::from_base64(Some(base64_key))?;
        let report = |stage: SaveStage| {
            if let Some(cb) = progress {
                cb(stage);
            }
        };

        report(SaveStage::Serializing);
        let json =
            serde_json::to_vec(vault).map_err(|e| VaultError::SerializationError(e.to_string()))?;

        report(SaveStage::Compressing);
        let compressed = gzip(&json, self.compression)?;

        report(SaveStage::Encrypting);
        let ciphertext =
            encrypt_bytes(self.cipher.as_ref(), &compressed, Some(base64_key), cancel).await?;

        report(SaveStage::Uploading);
        check_cancelled(cancel)?;
        self.storage.put(vault.id(), ciphertext, cancel).await?;

        report(SaveStage::Complete);
        info!(
            vault_id = vault.id(),
            secrets = vault.len(),
            plain_bytes = json.len(),
            "vault saved"
        );
        Ok(())
    }

    /// Consistency report for `vault`.
    pub fn verify(&self, vault: &Vault) -> VerifyResults {
        verify::verify(vault)
    }

    /// Derive the key for `vault_id` from a passphrase, using the
    /// algorithm's default preset and the vault's salt.
    pub async fn unlock_key(
        kdf: &KeyDerivationService,
        algorithm: KdfAlgorithm,
        passphrase: &Passphrase,
        vault_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        kdf.derive_key(algorithm, passphrase, &vault_salt(vault_id), cancel)
            .await
    }

    /// Like `unlock_key`, with explicit KDF options.
    pub async fn unlock_key_with_options(
        kdf: &KeyDerivationService,
        algorithm: KdfAlgorithm,
        options: &KdfOptions,
        passphrase: &Passphrase,
        vault_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        kdf.derive_key_with_options(algorithm, passphrase, &vault_salt(vault_id), options, cancel)
            .await
    }
}

impl std::fmt::Debug for VaultManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultManager")
            .field("storage", &self.storage)
            .field("cipher", &self.cipher.name())
            .field("compression", &self.compression.level())
            .finish()
    }
}

fn gzip(data: &[u8], level: Compression) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), level);
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| VaultError::InvalidVaultFormat(format!("failed to decompress vault: {e}")))?;
    Ok(out)
}
