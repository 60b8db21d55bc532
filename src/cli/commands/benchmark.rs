//! `cloudvault benchmark`: time each KDF algorithm.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::output;
use crate::crypto::RandomGenerator;
use crate::errors::{Result, VaultError};
use crate::kdf::{KdfAlgorithm, KeyDerivationService};

/// Execute the `benchmark` command.
pub async fn execute(count: usize, quick: bool, cancel: &CancellationToken) -> Result<()> {
    if count == 0 {
        return Err(VaultError::InvalidArgument("count must be at least 1".into()));
    }

    let kdf = KeyDerivationService::new(Arc::new(RandomGenerator::new()));
    output::info(&format!("Running {count} derivation(s) per algorithm..."));

    let results = if quick {
        let presets: Vec<_> = KdfAlgorithm::ALL
            .iter()
            .map(|&alg| (alg, alg.test_options()))
            .collect();
        kdf.benchmark_with(count, &presets, cancel).await
    } else {
        kdf.benchmark_all(count, cancel).await
    };
    kdf.release();

    output::print_benchmark_table(&results?);
    Ok(())
}
