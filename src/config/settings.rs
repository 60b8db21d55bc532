use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::AeadBackend;
use crate::errors::{Result, VaultError};
use crate::kdf::options::{HASH, ITERATIONS, LENGTH, MEMORY_KIB, PARALLELISM, TIME_COST};
use crate::kdf::{KdfAlgorithm, KdfOptions};

/// Highest gzip level flate2 accepts.
const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Project-level configuration, loaded from `cloudvault.toml`.
///
/// Every field has a default so CloudVault works without any config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to project root) used by the filesystem transport.
    #[serde(default = "default_store_dir")]
    pub store_dir: String,

    /// Directory (relative to project root) for the metadata cache.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Identity that owns the vaults in this project.
    #[serde(default = "default_identity_id")]
    pub identity_id: String,

    /// AEAD implementation used to seal vaults.
    #[serde(default)]
    pub aead_backend: AeadBackend,

    /// Passphrase KDF used to unlock vaults.
    #[serde(default = "default_kdf_algorithm")]
    pub kdf_algorithm: KdfAlgorithm,

    /// PBKDF2 iteration count (default: 100 000).
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,

    /// PBKDF2 HMAC hash (default: SHA256).
    #[serde(default = "default_pbkdf2_hash")]
    pub pbkdf2_hash: String,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 pass count (default: 3).
    #[serde(default = "default_argon2_time_cost")]
    pub argon2_time_cost: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// gzip level applied before encryption, 0-9 (default: 6).
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_store_dir() -> String {
    ".cloudvault/store".to_string()
}

fn default_cache_dir() -> String {
    ".cloudvault/cache".to_string()
}

fn default_identity_id() -> String {
    "local".to_string()
}

fn default_kdf_algorithm() -> KdfAlgorithm {
    KdfAlgorithm::Argon2id
}

fn default_pbkdf2_iterations() -> u32 {
    100_000
}

fn default_pbkdf2_hash() -> String {
    "SHA256".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_time_cost() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_compression_level() -> u32 {
    6
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            cache_dir: default_cache_dir(),
            identity_id: default_identity_id(),
            aead_backend: AeadBackend::default(),
            kdf_algorithm: default_kdf_algorithm(),
            pbkdf2_iterations: default_pbkdf2_iterations(),
            pbkdf2_hash: default_pbkdf2_hash(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_time_cost: default_argon2_time_cost(),
            argon2_parallelism: default_argon2_parallelism(),
            compression_level: default_compression_level(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = "cloudvault.toml";

    /// Load settings from `<project_dir>/cloudvault.toml`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(VaultError::ConfigError(format!(
                "compression_level must be between 0 and {MAX_COMPRESSION_LEVEL} (got {})",
                settings.compression_level
            )));
        }

        Ok(settings)
    }

    /// Root directory of the filesystem object store.
    pub fn store_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.store_dir)
    }

    /// Directory holding the metadata cache.
    pub fn cache_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.cache_dir)
    }

    /// The configured KDF parameters for `kdf_algorithm`.
    pub fn kdf_options(&self) -> KdfOptions {
        match self.kdf_algorithm {
            KdfAlgorithm::Pbkdf2 => KdfOptions::new("config")
                .with(ITERATIONS, self.pbkdf2_iterations)
                .with(HASH, self.pbkdf2_hash.as_str())
                .with(LENGTH, 32u32),
            KdfAlgorithm::Argon2id => KdfOptions::new("config")
                .with(MEMORY_KIB, self.argon2_memory_kib)
                .with(TIME_COST, self.argon2_time_cost)
                .with(PARALLELISM, self.argon2_parallelism)
                .with(LENGTH, 32u32),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
