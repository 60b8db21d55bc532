//! The in-memory vault.
//!
//! A `Vault` holds its `VaultInfo`, the listable index, and the secret
//! payloads keyed by id.  Index entries and payloads are kept 1:1 by id:
//! every mutation below updates both or neither.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::metadata::VaultMetadata;
use super::secret::{IndexEntry, Secret, SecretData, SecretType, TAG_DELIMITER};
use crate::errors::{Result, VaultError};

/// Identity and descriptive fields of a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One externally-parsed record for bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSecretRow {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Payload fields by descriptor name.
    #[serde(default)]
    pub fields: HashMap<String, String>,
}

/// A decrypted vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    info: VaultInfo,
    #[serde(default)]
    index: Vec<IndexEntry>,
    #[serde(default)]
    secrets: BTreeMap<String, Secret>,
}

impl Vault {
    /// An empty vault with a fresh id.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name, description)
    }

    /// An empty vault with a caller-chosen id.
    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            info: VaultInfo {
                id: id.into(),
                name: name.into(),
                description: description.into(),
                created_at: now,
                updated_at: now,
            },
            index: Vec::new(),
            secrets: BTreeMap::new(),
        }
    }

    pub fn info(&self) -> &VaultInfo {
        &self.info
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn index(&self) -> &[IndexEntry] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub(crate) fn secrets(&self) -> &BTreeMap<String, Secret> {
        &self.secrets
    }

    pub fn rename(&mut self, name: impl Into<String>, description: impl Into<String>) {
        self.info.name = name.into();
        self.info.description = description.into();
        self.touch();
    }

    /// Insert a new secret.  An empty id is replaced with a fresh one.
    ///
    /// Returns the secret's id.
    pub fn add_secret(&mut self, mut secret: Secret) -> Result<String> {
        if secret.id.is_empty() {
            secret.id = Uuid::new_v4().to_string();
        }
        validate_name(&secret.name)?;
        validate_tags(&secret.tags)?;
        if self.contains(&secret.id) {
            return Err(VaultError::SecretAlreadyExists(secret.id));
        }

        let id = secret.id.clone();
        self.index.push(secret.index_entry());
        self.secrets.insert(id.clone(), secret);
        self.touch();
        Ok(id)
    }

    /// Replace the payload and index entry of an existing secret.
    ///
    /// `created_at` is kept from the stored secret; `updated_at` is set to now.
    pub fn update_secret(&mut self, mut secret: Secret) -> Result<()> {
        validate_name(&secret.name)?;
        validate_tags(&secret.tags)?;
        let position = self
            .index
            .iter()
            .position(|e| e.id == secret.id)
            .ok_or_else(|| VaultError::SecretNotFound(secret.id.clone()))?;
        let existing = self
            .secrets
            .get(&secret.id)
            .ok_or_else(|| VaultError::SecretNotFound(secret.id.clone()))?;

        secret.created_at = existing.created_at;
        secret.updated_at = Utc::now();
        self.index[position] = secret.index_entry();
        self.secrets.insert(secret.id.clone(), secret);
        self.touch();
        Ok(())
    }

    /// Remove a secret and its index entry.  Returns whether it existed.
    pub fn delete_secret(&mut self, id: &str) -> bool {
        let before = self.index.len();
        self.index.retain(|e| e.id != id);
        let removed_entry = self.index.len() != before;
        let removed_payload = self.secrets.remove(id).is_some();

        let existed = removed_entry || removed_payload;
        if existed {
            self.touch();
        }
        existed
    }

    /// Map raw rows onto `secret_type` secrets and insert them all.
    ///
    /// Every row is validated before any is inserted, so a bad row leaves
    /// the vault unchanged.  Returns the new ids in row order.
    pub fn add_raw_secrets(
        &mut self,
        rows: &[RawSecretRow],
        secret_type: SecretType,
    ) -> Result<Vec<String>> {
        let mut prepared = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            validate_name(&row.name)
                .and_then(|()| validate_tags(&row.tags))
                .map_err(|e| VaultError::InvalidArgument(format!("row {}: {e}", i + 1)))?;
            let data = SecretData::from_fields(secret_type, &row.fields)
                .map_err(|e| VaultError::InvalidArgument(format!("row {}: {e}", i + 1)))?;
            prepared.push(
                Secret::new(row.name.clone(), data)
                    .with_description(row.description.clone())
                    .with_tags(row.tags.iter().cloned()),
            );
        }

        let ids: Vec<String> = prepared.iter().map(|s| s.id.clone()).collect();
        for secret in prepared {
            self.index.push(secret.index_entry());
            self.secrets.insert(secret.id.clone(), secret);
        }
        if !ids.is_empty() {
            self.touch();
        }
        Ok(ids)
    }

    pub fn get_secret(&self, id: &str) -> Result<&Secret> {
        self.secrets
            .get(id)
            .ok_or_else(|| VaultError::SecretNotFound(id.to_string()))
    }

    /// Index entries matching `query` in name, description or tags.
    pub fn search(&self, query: &str) -> Vec<&IndexEntry> {
        let query = query.trim();
        if query.is_empty() {
            return self.index.iter().collect();
        }
        self.index.iter().filter(|e| e.matches(query)).collect()
    }

    /// Unencrypted summary for the metadata cache.
    pub fn metadata(&self) -> VaultMetadata {
        VaultMetadata {
            id: self.info.id.clone(),
            name: self.info.name.clone(),
            description: self.info.description.clone(),
            index: self.index.clone(),
        }
    }

    /// Ids that appear more than once in the index.
    pub(crate) fn duplicate_index_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for entry in &self.index {
            if !seen.insert(entry.id.as_str()) && !dupes.contains(&entry.id.as_str()) {
                dupes.push(entry.id.as_str());
            }
        }
        dupes
    }

    fn contains(&self, id: &str) -> bool {
        self.secrets.contains_key(id) || self.index.iter().any(|e| e.id == id)
    }

    fn touch(&mut self) {
        self.info.updated_at = Utc::now();
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(VaultError::InvalidArgument("secret name cannot be empty".into()));
    }
    Ok(())
}

// The index stores tags as one delimited string.
fn validate_tags(tags: &[String]) -> Result<()> {
    match tags.iter().find(|t| t.contains(TAG_DELIMITER)) {
        Some(tag) => Err(VaultError::InvalidArgument(format!(
            "tag '{tag}' must not contain '{TAG_DELIMITER}'"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(name: &str) -> Secret {
        Secret::new(name, SecretData::Note { text: "body".into() })
    }

    #[test]
    fn add_then_delete_keeps_index_and_payload_in_step() {
        let mut vault = Vault::new("personal", "");
        let id = vault.add_secret(note("a")).unwrap();
        assert_eq!(vault.len(), 1);
        assert_eq!(vault.get_secret(&id).unwrap().name, "a");

        assert!(vault.delete_secret(&id));
        assert!(vault.is_empty());
        assert!(vault.secrets().is_empty());
        assert!(!vault.delete_secret(&id));
    }

    #[test]
    fn add_assigns_id_when_missing() {
        let mut vault = Vault::new("v", "");
        let mut secret = note("a");
        secret.id.clear();
        let id = vault.add_secret(secret).unwrap();
        assert!(!id.is_empty());
        assert_eq!(vault.index()[0].id, id);
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut vault = Vault::new("v", "");
        let secret = note("a");
        vault.add_secret(secret.clone()).unwrap();
        assert!(matches!(
            vault.add_secret(secret),
            Err(VaultError::SecretAlreadyExists(_))
        ));
        assert_eq!(vault.len(), 1);
    }

    #[test]
    fn update_replaces_entry_and_keeps_created_at() {
        let mut vault = Vault::new("v", "");
        let original = note("a");
        let created = original.created_at;
        let id = vault.add_secret(original.clone()).unwrap();

        let mut changed = original.with_description("new").with_tags(["t"]);
        changed.created_at = Utc::now() + chrono::Duration::days(1);
        changed.name = "renamed".into();
        vault.update_secret(changed).unwrap();

        let stored = vault.get_secret(&id).unwrap();
        assert_eq!(stored.name, "renamed");
        assert_eq!(stored.created_at, created);
        assert_eq!(vault.index()[0].name, "renamed");
        assert_eq!(vault.index()[0].tags, "t");
    }

    #[test]
    fn update_of_unknown_id_fails() {
        let mut vault = Vault::new("v", "");
        assert!(matches!(
            vault.update_secret(note("ghost")),
            Err(VaultError::SecretNotFound(_))
        ));
        assert!(vault.is_empty());
    }

    #[test]
    fn raw_rows_are_all_or_nothing() {
        let mut vault = Vault::new("v", "");
        let good = RawSecretRow {
            name: "github".into(),
            fields: HashMap::from([("username".to_string(), "me".to_string())]),
            ..Default::default()
        };
        let bad = RawSecretRow {
            name: "broken".into(),
            fields: HashMap::from([("cvv".to_string(), "123".to_string())]),
            ..Default::default()
        };

        let err = vault
            .add_raw_secrets(&[good.clone(), bad], SecretType::Web)
            .unwrap_err();
        assert!(err.to_string().contains("row 2"));
        assert!(vault.is_empty());

        let ids = vault.add_raw_secrets(&[good], SecretType::Web).unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(vault.get_secret(&ids[0]).unwrap().secret_type(), SecretType::Web);
    }

    #[test]
    fn tags_containing_the_delimiter_are_rejected() {
        let mut vault = Vault::new("v", "");
        assert!(matches!(
            vault.add_secret(note("a").with_tags(["prod,infra"])),
            Err(VaultError::InvalidArgument(_))
        ));
        assert!(vault.is_empty());

        let id = vault.add_secret(note("a").with_tags(["prod"])).unwrap();
        let changed = vault.get_secret(&id).unwrap().clone().with_tags(["a,b"]);
        assert!(vault.update_secret(changed).is_err());
        assert_eq!(vault.index()[0].tag_list(), vec!["prod"]);

        let row = RawSecretRow {
            name: "n".into(),
            tags: vec!["x,y".into()],
            ..Default::default()
        };
        let err = vault.add_raw_secrets(&[row], SecretType::Note).unwrap_err();
        assert!(err.to_string().contains("row 1"));
        assert_eq!(vault.len(), 1);
    }

    #[test]
    fn search_filters_index() {
        let mut vault = Vault::new("v", "");
        vault.add_secret(note("bank").with_tags(["finance"])).unwrap();
        vault.add_secret(note("email")).unwrap();

        assert_eq!(vault.search("FIN").len(), 1);
        assert_eq!(vault.search("").len(), 2);
        assert!(vault.search("zzz").is_empty());
    }

    #[test]
    fn metadata_copies_index() {
        let mut vault = Vault::new("v", "desc");
        vault.add_secret(note("a")).unwrap();
        let meta = vault.metadata();
        assert_eq!(meta.id, vault.id());
        assert_eq!(meta.description, "desc");
        assert_eq!(meta.index, vault.index());
    }
}
