//! `cloudvault show`: decrypt a vault and print one secret.

use tokio_util::sync::CancellationToken;

use crate::cli::output;
use crate::cli::{require_vault, Cli, Context};
use crate::errors::Result;

/// Execute the `show` command.
pub async fn execute(cli: &Cli, id: &str, reveal: bool, cancel: &CancellationToken) -> Result<()> {
    let vault_id = require_vault(cli)?;
    let ctx = Context::load(cli)?;

    let key = ctx.unlock(vault_id, cancel).await?;
    let vault = ctx.manager.load(vault_id, &key, cancel).await?;

    output::print_secret(vault.get_secret(id)?, reveal);
    if !reveal {
        output::tip("Pass --reveal to print sensitive fields.");
    }

    Ok(())
}
