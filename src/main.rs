use clap::Parser;
use cloudvault::cli::{output, Cli, Commands};
use cloudvault::errors::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let cancel = install_signal_handler();

    if let Err(e) = run(&cli, &cancel).await {
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, cancel: &CancellationToken) -> Result<()> {
    use cloudvault::cli::commands;

    match cli.command {
        Commands::Init {
            ref name,
            ref description,
        } => commands::init::execute(cli, name, description, cancel).await,
        Commands::List { ref search } => {
            commands::list::execute(cli, search.as_deref(), cancel).await
        }
        Commands::Show { ref id, reveal } => commands::show::execute(cli, id, reveal, cancel).await,
        Commands::Add {
            ref name,
            secret_type,
            ref fields,
            ref description,
            ref tags,
        } => {
            commands::add::execute(cli, name, secret_type, fields, description, tags, cancel).await
        }
        Commands::Delete { ref id, force } => {
            commands::delete::execute(cli, id, force, cancel).await
        }
        Commands::Verify => commands::verify::execute(cli, cancel).await,
        Commands::DeriveKey {
            ref salt,
            algorithm,
        } => commands::derive_key::execute(cli, salt.as_deref(), algorithm, cancel).await,
        Commands::Benchmark { count, quick } => {
            commands::benchmark::execute(count, quick, cancel).await
        }
        Commands::Completions { ref shell } => commands::completions::execute(shell),
    }
}

/// Log to stderr, filtered by `CLOUDVAULT_LOG` (falls back to `RUST_LOG`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("CLOUDVAULT_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("cloudvault=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

/// Cancel in-flight work on Ctrl+C.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, cancelling");
            token_clone.cancel();
        }
        debug!("signal handler finished");
    });

    token
}
