//! `cloudvault add`: add a secret to a vault.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::output;
use crate::cli::{require_vault, Cli, Context};
use crate::errors::{Result, VaultError};
use crate::vault::{SaveStage, Secret, SecretData, SecretType};

/// Execute the `add` command.
pub async fn execute(
    cli: &Cli,
    name: &str,
    secret_type: SecretType,
    fields: &[(String, String)],
    description: &str,
    tags: &[String],
    cancel: &CancellationToken,
) -> Result<()> {
    let vault_id = require_vault(cli)?;
    let ctx = Context::load(cli)?;

    // 1. Build the payload before touching the vault.
    let mut values: HashMap<String, String> = fields.iter().cloned().collect();
    prompt_missing_sensitive(secret_type, &mut values)?;
    let data = SecretData::from_fields(secret_type, &values)?;
    let secret = Secret::new(name, data)
        .with_description(description)
        .with_tags(tags.iter().cloned());

    // 2. Unlock, mutate, save.
    let key = ctx.unlock(vault_id, cancel).await?;
    let mut vault = ctx.manager.load(vault_id, &key, cancel).await?;
    let id = vault.add_secret(secret)?;

    let progress = |stage: SaveStage| debug!(?stage, "saving vault");
    ctx.manager.save(&vault, &key, Some(&progress), cancel).await?;

    // 3. Keep the local listing current.
    let mut cache = ctx.metadata_cache()?;
    cache.upsert(vault.metadata());
    cache.persist()?;

    output::success(&format!("Added {secret_type} secret '{name}' with id {id}"));
    Ok(())
}

/// Ask for sensitive fields that were not given on the command line.
///
/// Only prompts when a user is attached to the terminal; otherwise the
/// fields stay empty.
fn prompt_missing_sensitive(
    secret_type: SecretType,
    values: &mut HashMap<String, String>,
) -> Result<()> {
    if !console::user_attended() {
        return Ok(());
    }
    for descriptor in secret_type.fields().iter().filter(|d| d.sensitive) {
        if values.contains_key(descriptor.name) {
            continue;
        }
        let value = dialoguer::Password::new()
            .with_prompt(descriptor.label)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("field prompt: {e}")))?;
        values.insert(descriptor.name.to_string(), value);
    }
    Ok(())
}
