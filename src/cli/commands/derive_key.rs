//! `cloudvault derive-key`: print the base64 key for a passphrase.
//!
//! Uses the KDF parameters from `cloudvault.toml` when the algorithm
//! matches the configured one, and the algorithm's default preset
//! otherwise.

use tokio_util::sync::CancellationToken;

use crate::cli::{read_passphrase, require_vault, Cli, Context};
use crate::errors::Result;
use crate::kdf::{vault_salt, KdfAlgorithm};

/// Execute the `derive-key` command.
pub async fn execute(
    cli: &Cli,
    salt: Option<&str>,
    algorithm: Option<KdfAlgorithm>,
    cancel: &CancellationToken,
) -> Result<()> {
    let salt = match salt {
        Some(s) => s.to_string(),
        None => vault_salt(require_vault(cli)?),
    };

    let ctx = Context::load(cli)?;
    let algorithm = algorithm.unwrap_or(ctx.settings.kdf_algorithm);
    let options = if algorithm == ctx.settings.kdf_algorithm {
        ctx.settings.kdf_options()
    } else {
        algorithm.default_options()
    };

    let passphrase = read_passphrase()?;
    let key = ctx
        .kdf
        .derive_key_with_options(algorithm, &passphrase, &salt, &options, cancel)
        .await?;

    println!("{key}");
    Ok(())
}
