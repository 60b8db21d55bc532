//! `cloudvault verify`: consistency check of a decrypted vault.

use tokio_util::sync::CancellationToken;

use crate::cli::output;
use crate::cli::{require_vault, Cli, Context};
use crate::errors::{Result, VaultError};

/// Execute the `verify` command.  Fails if any issue is found.
pub async fn execute(cli: &Cli, cancel: &CancellationToken) -> Result<()> {
    let vault_id = require_vault(cli)?;
    let ctx = Context::load(cli)?;

    let key = ctx.unlock(vault_id, cancel).await?;
    let vault = ctx.manager.load(vault_id, &key, cancel).await?;

    let results = ctx.manager.verify(&vault);
    output::print_verify_results(&results);

    if results.is_valid() {
        Ok(())
    } else {
        Err(VaultError::CommandFailed(format!(
            "{} issue(s) found in vault '{vault_id}'",
            results.issues.len()
        )))
    }
}
