use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::key::{validate_component, ObjectKey};
use super::transport::ObjectTransport;
use crate::errors::{Result, VaultError};

/// Identity-scoped get/put of encrypted vault blobs.
///
/// The provider only ever handles ciphertext.  It never retries: a transport
/// failure is returned to the caller as-is.
#[derive(Clone)]
pub struct CloudStorageProvider {
    transport: Arc<dyn ObjectTransport>,
    identity_id: String,
}

impl CloudStorageProvider {
    pub fn new(transport: Arc<dyn ObjectTransport>, identity_id: &str) -> Result<Self> {
        validate_component("identity id", identity_id)?;
        Ok(Self {
            transport,
            identity_id: identity_id.to_string(),
        })
    }

    pub fn identity_id(&self) -> &str {
        &self.identity_id
    }

    pub fn key_for(&self, vault_id: &str) -> Result<ObjectKey> {
        ObjectKey::new(&self.identity_id, vault_id)
    }

    /// Fetch the ciphertext for `vault_id`, or `VaultNotFound`.
    pub async fn get(&self, vault_id: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let key = self.key_for(vault_id)?;
        debug!(object = %key, "fetching vault object");

        self.transport
            .get_object(&key.object_path(), cancel)
            .await?
            .ok_or_else(|| VaultError::VaultNotFound {
                identity_id: self.identity_id.clone(),
                vault_id: vault_id.to_string(),
            })
    }

    /// Store the ciphertext for `vault_id`, replacing any previous version.
    pub async fn put(
        &self,
        vault_id: &str,
        ciphertext: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let key = self.key_for(vault_id)?;
        let len = ciphertext.len();
        self.transport
            .put_object(&key.object_path(), ciphertext, cancel)
            .await?;
        info!(object = %key, bytes = len, "vault object stored");
        Ok(())
    }
}

impl std::fmt::Debug for CloudStorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudStorageProvider")
            .field("identity_id", &self.identity_id)
            .finish_non_exhaustive()
    }
}
