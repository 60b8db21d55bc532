//! Passphrase-based key derivation.

pub mod algorithm;
pub mod options;
pub mod passphrase;
pub mod service;

pub use algorithm::{KdfAlgorithm, PreparedKdf};
pub use options::{KdfOptions, OptionValue};
pub use passphrase::Passphrase;
pub use service::{vault_salt, BenchmarkResult, KeyDerivationService};
