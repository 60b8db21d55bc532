//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::crypto::RandomGenerator;
use crate::errors::{Result, VaultError};
use crate::kdf::{KdfAlgorithm, KeyDerivationService, Passphrase};
use crate::storage::key::validate_component;
use crate::vault::{MetadataCache, SecretType, VaultManager};

/// Minimum passphrase length to prevent trivially weak passphrases.
const MIN_PASSPHRASE_LEN: usize = 8;

/// Environment variable consulted before prompting for a passphrase.
pub const PASSPHRASE_ENV: &str = "CLOUDVAULT_PASSPHRASE";

/// CloudVault CLI: end-to-end encrypted secrets vault.
#[derive(Parser)]
#[command(
    name = "cloudvault",
    about = "End-to-end encrypted secrets vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault id to operate on
    #[arg(short, long, global = true, env = "CLOUDVAULT_VAULT")]
    pub vault: Option<String>,

    /// Project directory containing cloudvault.toml (default: current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new, empty vault
    Init {
        /// Display name of the vault
        name: String,
        /// Optional description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// List cached vaults, or the secrets of --vault
    List {
        /// Only show secrets matching this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show one secret's fields
    Show {
        /// Secret id
        id: String,
        /// Print sensitive fields in clear text
        #[arg(long)]
        reveal: bool,
    },

    /// Add a secret
    Add {
        /// Secret name
        name: String,
        /// Secret type: web, note, api-key, card
        #[arg(short = 't', long = "type", default_value = "web")]
        secret_type: SecretType,
        /// Field value as NAME=VALUE (repeatable)
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        /// Optional description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Delete a secret
    Delete {
        /// Secret id
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Check a vault for index/payload inconsistencies
    Verify,

    /// Derive a key from a passphrase and print it as base64
    DeriveKey {
        /// Base64 salt (default: the salt of --vault)
        #[arg(long)]
        salt: Option<String>,
        /// KDF algorithm (default: from cloudvault.toml)
        #[arg(short, long)]
        algorithm: Option<KdfAlgorithm>,
    },

    /// Time every KDF algorithm on this machine
    Benchmark {
        /// Derivations per algorithm
        #[arg(short = 'n', long, default_value = "3")]
        count: usize,
        /// Use the reduced-cost test presets
        #[arg(long)]
        quick: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },
}

/// Parse a `NAME=VALUE` field argument.
fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Everything a command needs to talk to the vault store.
pub struct Context {
    pub project_dir: PathBuf,
    pub settings: Settings,
    pub manager: VaultManager,
    pub kdf: KeyDerivationService,
}

impl Context {
    pub fn load(cli: &Cli) -> Result<Self> {
        let project_dir = match &cli.project_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let settings = Settings::load(&project_dir)?;
        let rng = Arc::new(RandomGenerator::new());
        let manager = VaultManager::from_settings(&settings, &project_dir, rng.clone())?;
        let kdf = KeyDerivationService::new(rng);
        Ok(Self {
            project_dir,
            settings,
            manager,
            kdf,
        })
    }

    pub fn metadata_cache(&self) -> Result<MetadataCache> {
        MetadataCache::open(&self.settings.cache_path(&self.project_dir))
    }

    /// Derive the key for `vault_id` from the user's passphrase.
    pub async fn unlock(&self, vault_id: &str, cancel: &CancellationToken) -> Result<String> {
        let passphrase = read_passphrase()?;
        self.derive_vault_key(&passphrase, vault_id, cancel).await
    }

    pub async fn derive_vault_key(
        &self,
        passphrase: &Passphrase,
        vault_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        VaultManager::unlock_key_with_options(
            &self.kdf,
            self.settings.kdf_algorithm,
            &self.settings.kdf_options(),
            passphrase,
            vault_id,
            cancel,
        )
        .await
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.kdf.release();
    }
}

/// The `--vault` argument, validated.
pub fn require_vault(cli: &Cli) -> Result<&str> {
    let id = cli.vault.as_deref().ok_or_else(|| {
        VaultError::CommandFailed("no vault selected; pass --vault <ID> or set CLOUDVAULT_VAULT".into())
    })?;
    validate_component("vault id", id)?;
    Ok(id)
}

/// Get the vault passphrase, trying in order:
/// 1. `CLOUDVAULT_PASSPHRASE` env var (CI/CD)
/// 2. Interactive prompt
pub fn read_passphrase() -> Result<Passphrase> {
    if let Some(p) = passphrase_from_env() {
        return Ok(p);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter vault passphrase")
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("passphrase prompt: {e}")))?;
    Ok(Passphrase::new(pw))
}

/// Prompt for a new passphrase with confirmation (used during `init`).
///
/// Also respects `CLOUDVAULT_PASSPHRASE` for scripted/CI usage.
/// Enforces a minimum length.
pub fn read_new_passphrase() -> Result<Passphrase> {
    if let Some(p) = passphrase_from_env() {
        if p.char_len() < MIN_PASSPHRASE_LEN {
            return Err(VaultError::CommandFailed(format!(
                "passphrase must be at least {MIN_PASSPHRASE_LEN} characters"
            )));
        }
        return Ok(p);
    }

    loop {
        let pw = dialoguer::Password::new()
            .with_prompt("Choose vault passphrase")
            .with_confirmation(
                "Confirm vault passphrase",
                "Passphrases do not match, try again",
            )
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("passphrase prompt: {e}")))?;
        let passphrase = Passphrase::new(pw);

        if passphrase.char_len() < MIN_PASSPHRASE_LEN {
            output::warning(&format!(
                "Passphrase must be at least {MIN_PASSPHRASE_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(passphrase);
    }
}

fn passphrase_from_env() -> Option<Passphrase> {
    std::env::var(PASSPHRASE_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .map(Passphrase::new)
}
