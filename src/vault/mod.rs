//! Vault module: the decrypted data model and its persistence.
//!
//! This module provides:
//! - `Secret`, `SecretData` and `IndexEntry` types (`secret`)
//! - The in-memory `Vault` and its mutation operations (`model`)
//! - Consistency checks (`verify`)
//! - `VaultManager` for load/save through storage (`manager`)
//! - The unencrypted `MetadataCache` (`metadata`)

pub mod manager;
pub mod metadata;
pub mod model;
pub mod secret;
pub mod verify;

// Re-export the most commonly used items.
pub use manager::{SaveProgress, SaveStage, VaultManager, DEFAULT_COMPRESSION_LEVEL};
pub use metadata::{MetadataCache, VaultMetadata};
pub use model::{RawSecretRow, Vault, VaultInfo};
pub use secret::{FieldDescriptor, IndexEntry, Secret, SecretData, SecretType};
pub use verify::{verify, VerifyIssue, VerifyResults};
