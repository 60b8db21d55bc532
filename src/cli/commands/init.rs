//! `cloudvault init`: create a new, empty vault.

use tokio_util::sync::CancellationToken;

use crate::cli::output;
use crate::cli::{read_new_passphrase, Cli, Context};
use crate::errors::{Result, VaultError};
use crate::storage::key::validate_component;
use crate::vault::Vault;

/// Execute the `init` command.
pub async fn execute(
    cli: &Cli,
    name: &str,
    description: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let ctx = Context::load(cli)?;

    // 1. Use --vault as the id if given, otherwise generate one.
    let vault = match cli.vault.as_deref() {
        Some(id) => {
            validate_component("vault id", id)?;
            Vault::with_id(id, name, description)
        }
        None => Vault::new(name, description),
    };

    // 2. Refuse to overwrite an existing vault.
    match ctx.manager.storage().get(vault.id(), cancel).await {
        Err(VaultError::VaultNotFound { .. }) => {}
        Ok(_) => {
            output::tip("Pick another id with --vault, or omit it to generate one.");
            return Err(VaultError::CommandFailed(format!(
                "vault '{}' already exists",
                vault.id()
            )));
        }
        Err(e) => return Err(e),
    }

    // 3. Prompt for a new passphrase and derive the key.
    let passphrase = read_new_passphrase()?;
    let key = ctx.derive_vault_key(&passphrase, vault.id(), cancel).await?;

    // 4. Upload the empty vault and remember it locally.
    ctx.manager.save(&vault, &key, None, cancel).await?;
    let mut cache = ctx.metadata_cache()?;
    cache.upsert(vault.metadata());
    cache.persist()?;

    output::success(&format!("Vault '{}' created with id {}", name, vault.id()));
    output::tip(&format!(
        "Run `cloudvault --vault {} add <NAME>` to add a secret.",
        vault.id()
    ));

    Ok(())
}
