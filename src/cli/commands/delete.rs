//! `cloudvault delete`: remove a secret from a vault.

use dialoguer::Confirm;
use tokio_util::sync::CancellationToken;

use crate::cli::output;
use crate::cli::{require_vault, Cli, Context};
use crate::errors::{Result, VaultError};

/// Execute the `delete` command.
pub async fn execute(cli: &Cli, id: &str, force: bool, cancel: &CancellationToken) -> Result<()> {
    let vault_id = require_vault(cli)?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete secret '{id}'?"))
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let ctx = Context::load(cli)?;
    let key = ctx.unlock(vault_id, cancel).await?;
    let mut vault = ctx.manager.load(vault_id, &key, cancel).await?;

    if !vault.delete_secret(id) {
        return Err(VaultError::SecretNotFound(id.to_string()));
    }
    ctx.manager.save(&vault, &key, None, cancel).await?;

    let mut cache = ctx.metadata_cache()?;
    cache.upsert(vault.metadata());
    cache.persist()?;

    output::success(&format!("Deleted secret '{id}'"));
    Ok(())
}
