//! Read-only consistency checks over a loaded vault.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use super::model::Vault;
use super::secret::join_tags;

/// One consistency problem found by `verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerifyIssue {
    /// The vault itself has no id.
    MissingVaultId,
    /// An index entry has no payload.
    OrphanIndexEntry { id: String },
    /// A payload has no index entry.
    OrphanSecret { id: String },
    /// The same id appears more than once in the index.
    DuplicateIndexEntry { id: String },
    /// A payload is stored under a key that differs from its own id.
    MismatchedSecretId { key: String, id: String },
    /// Index name, description or tags disagree with the payload.
    StaleIndexEntry { id: String },
    /// A secret with a blank name.
    EmptySecretName { id: String },
}

impl fmt::Display for VerifyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVaultId => write!(f, "vault has no id"),
            Self::OrphanIndexEntry { id } => write!(f, "index entry {id} has no secret"),
            Self::OrphanSecret { id } => write!(f, "secret {id} has no index entry"),
            Self::DuplicateIndexEntry { id } => write!(f, "index entry {id} appears more than once"),
            Self::MismatchedSecretId { key, id } => {
                write!(f, "secret stored under {key} claims id {id}")
            }
            Self::StaleIndexEntry { id } => {
                write!(f, "index entry {id} does not match its secret")
            }
            Self::EmptySecretName { id } => write!(f, "secret {id} has an empty name"),
        }
    }
}

/// The outcome of `verify`.  Empty `issues` means the vault is consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyResults {
    pub issues: Vec<VerifyIssue>,
}

impl VerifyResults {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Inspect `vault` and report every inconsistency.  Never fails.
pub fn verify(vault: &Vault) -> VerifyResults {
    let mut issues = Vec::new();
    let secrets = vault.secrets();

    if vault.id().trim().is_empty() {
        issues.push(VerifyIssue::MissingVaultId);
    }

    for id in vault.duplicate_index_ids() {
        issues.push(VerifyIssue::DuplicateIndexEntry { id: id.to_string() });
    }

    let mut indexed = HashSet::new();
    for entry in vault.index() {
        if !indexed.insert(entry.id.as_str()) {
            continue;
        }
        match secrets.get(&entry.id) {
            None => issues.push(VerifyIssue::OrphanIndexEntry {
                id: entry.id.clone(),
            }),
            Some(secret) => {
                if secret.name != entry.name
                    || secret.description != entry.description
                    || join_tags(&secret.tags) != entry.tags
                {
                    issues.push(VerifyIssue::StaleIndexEntry {
                        id: entry.id.clone(),
                    });
                }
            }
        }
    }

    for (key, secret) in secrets {
        if key != &secret.id {
            issues.push(VerifyIssue::MismatchedSecretId {
                key: key.clone(),
                id: secret.id.clone(),
            });
        }
        if !indexed.contains(key.as_str()) {
            issues.push(VerifyIssue::OrphanSecret { id: key.clone() });
        }
        if secret.name.trim().is_empty() {
            issues.push(VerifyIssue::EmptySecretName { id: key.clone() });
        }
    }

    VerifyResults { issues }
}
