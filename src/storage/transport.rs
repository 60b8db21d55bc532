//! Object-store transports.
//!
//! A transport moves opaque byte blobs to and from slash-separated paths.
//! Concrete cloud SDK clients live outside this crate and plug in through
//! `ObjectTransport`; two local implementations ship here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::crypto::stream::check_cancelled;
use crate::errors::{Result, VaultError};

/// Get/put access to an object store.
///
/// `put_object` must be all-or-nothing: after a failed or cancelled put the
/// previous object (or its absence) is still what `get_object` returns.
#[async_trait]
pub trait ObjectTransport: Send + Sync {
    /// Fetch an object.  `Ok(None)` means it does not exist.
    async fn get_object(&self, path: &str, cancel: &CancellationToken)
        -> Result<Option<Vec<u8>>>;

    /// Store an object, replacing any previous version.
    async fn put_object(&self, path: &str, bytes: Vec<u8>, cancel: &CancellationToken)
        -> Result<()>;
}

/// In-process transport backed by a map.  Useful for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths currently stored, sorted.
    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Overwrite an object directly, bypassing any provider.
    pub async fn insert_raw(&self, path: &str, bytes: Vec<u8>) {
        self.objects.write().await.insert(path.to_string(), bytes);
    }
}

#[async_trait]
impl ObjectTransport for MemoryTransport {
    async fn get_object(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<u8>>> {
        check_cancelled(cancel)?;
        Ok(self.objects.read().await.get(path).cloned())
    }

    async fn put_object(
        &self,
        path: &str,
        bytes: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_cancelled(cancel)?;
        self.objects.write().await.insert(path.to_string(), bytes);
        Ok(())
    }
}

/// Transport that maps object paths onto files under a root directory.
///
/// Writes go to a hidden temp file in the target directory and are then
/// renamed into place, so readers never observe a partial object.
#[derive(Debug, Clone)]
pub struct FileSystemTransport {
    root: PathBuf,
}

impl FileSystemTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let mut resolved = self.root.clone();
        for segment in path.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(VaultError::InvalidObjectKey(format!(
                    "object path '{path}' is not a clean relative path"
                )));
            }
            resolved.push(segment);
        }
        Ok(resolved)
    }
}

#[async_trait]
impl ObjectTransport for FileSystemTransport {
    async fn get_object(
        &self,
        path: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<u8>>> {
        check_cancelled(cancel)?;
        let file = self.resolve(path)?;
        match fs::read(&file).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VaultError::Storage(format!(
                "failed to read {}: {e}",
                file.display()
            ))),
        }
    }

    async fn put_object(
        &self,
        path: &str,
        bytes: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        check_cancelled(cancel)?;
        let file = self.resolve(path)?;
        let parent = file
            .parent()
            .ok_or_else(|| VaultError::Storage(format!("object path '{path}' has no parent")))?;
        fs::create_dir_all(parent).await?;

        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = parent.join(format!(".{file_name}.tmp"));

        fs::write(&tmp, &bytes).await?;

        // Last chance to back out before the object becomes visible.
        if cancel.is_cancelled() {
            let _ = fs::remove_file(&tmp).await;
            return Err(VaultError::Cancelled);
        }

        if let Err(e) = fs::rename(&tmp, &file).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(VaultError::Storage(format!(
                "failed to move {} into place: {e}",
                file.display()
            )));
        }

        debug!(path, bytes = bytes.len(), "object written");
        Ok(())
    }
}
