//! Unencrypted vault summaries, cached on the client.
//!
//! The cache lets a client list and pick vaults before any passphrase is
//! entered.  It holds names, descriptions and index entries only, never
//! secret payloads.  Each `MetadataCache` is owned by its caller and
//! backed by a single JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::secret::IndexEntry;
use crate::errors::{Result, VaultError};

/// Listable summary of one vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub index: Vec<IndexEntry>,
}

/// File-backed map of vault id to `VaultMetadata`.
#[derive(Debug)]
pub struct MetadataCache {
    path: PathBuf,
    entries: BTreeMap<String, VaultMetadata>,
}

impl MetadataCache {
    const FILE_NAME: &'static str = "metadata.json";

    /// Open (or start) the cache stored in `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(Self::FILE_NAME);
        let entries = if path.exists() {
            let contents = fs::read(&path)?;
            serde_json::from_slice(&contents).map_err(|e| {
                VaultError::SerializationError(format!(
                    "failed to parse {}: {e}",
                    path.display()
                ))
            })?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn upsert(&mut self, metadata: VaultMetadata) {
        self.entries.insert(metadata.id.clone(), metadata);
    }

    pub fn get(&self, vault_id: &str) -> Option<&VaultMetadata> {
        self.entries.get(vault_id)
    }

    /// All cached vaults, ordered by id.
    pub fn list(&self) -> Vec<&VaultMetadata> {
        self.entries.values().collect()
    }

    pub fn remove(&mut self, vault_id: &str) -> Option<VaultMetadata> {
        self.entries.remove(vault_id)
    }

    /// Write the cache to disk via temp file + rename.
    pub fn persist(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.entries)
            .map_err(|e| VaultError::SerializationError(e.to_string()))?;

        let parent = self.path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(parent)?;
        let tmp = parent.join(format!(".{}.tmp", Self::FILE_NAME));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), vaults = self.entries.len(), "metadata cache saved");
        Ok(())
    }
}
