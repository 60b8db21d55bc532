//! `cloudvault list`: show cached vaults, or the index of one vault.
//!
//! The index comes from the local metadata cache when possible, so listing
//! does not need the passphrase.  On a cache miss the vault is unlocked and
//! the cache refreshed.

use tokio_util::sync::CancellationToken;

use crate::cli::output;
use crate::cli::{Cli, Context};
use crate::errors::Result;
use crate::storage::key::validate_component;
use crate::vault::VaultMetadata;

/// Execute the `list` command.
pub async fn execute(cli: &Cli, search: Option<&str>, cancel: &CancellationToken) -> Result<()> {
    let ctx = Context::load(cli)?;
    let mut cache = ctx.metadata_cache()?;

    let Some(vault_id) = cli.vault.as_deref() else {
        output::print_vaults_table(&cache.list());
        return Ok(());
    };
    validate_component("vault id", vault_id)?;

    let metadata: VaultMetadata = match cache.get(vault_id) {
        Some(cached) => cached.clone(),
        None => {
            let key = ctx.unlock(vault_id, cancel).await?;
            let vault = ctx.manager.load(vault_id, &key, cancel).await?;
            let fresh = vault.metadata();
            cache.upsert(fresh.clone());
            cache.persist()?;
            fresh
        }
    };

    let entries: Vec<_> = match search {
        Some(q) => metadata.index.iter().filter(|e| e.matches(q)).collect(),
        None => metadata.index.iter().collect(),
    };

    output::info(&format!(
        "{} ({}): {} of {} secret(s)",
        metadata.name,
        metadata.id,
        entries.len(),
        metadata.index.len()
    ));
    output::print_index_table(&entries);

    Ok(())
}
