//! Identity-scoped object keys.
//!
//! Every vault object lives under its owner's identity prefix:
//!
//! ```text
//! identities/{identity_id}/vaults/{vault_id}.vault
//! ```
//!
//! Both components are validated so neither can contain a path separator
//! or a `..` segment.  Two different `(identity, vault)` pairs therefore
//! never map to the same path.

use std::fmt;

use crate::errors::{Result, VaultError};

/// Longest accepted identity or vault id.
const MAX_COMPONENT_LEN: usize = 128;

/// A validated `(identity, vault)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    identity_id: String,
    vault_id: String,
}

impl ObjectKey {
    pub fn new(identity_id: &str, vault_id: &str) -> Result<Self> {
        validate_component("identity id", identity_id)?;
        validate_component("vault id", vault_id)?;
        Ok(Self {
            identity_id: identity_id.to_string(),
            vault_id: vault_id.to_string(),
        })
    }

    pub fn identity_id(&self) -> &str {
        &self.identity_id
    }

    pub fn vault_id(&self) -> &str {
        &self.vault_id
    }

    /// The transport path of this object.
    pub fn object_path(&self) -> String {
        format!(
            "identities/{}/vaults/{}.vault",
            self.identity_id, self.vault_id
        )
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.object_path())
    }
}

/// Check one path component.
///
/// Allowed: ASCII letters, digits, `-`, `_`, `:`, `.`.  Must be non-empty,
/// at most 128 characters, and must not start with a dot.
pub(crate) fn validate_component(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(VaultError::InvalidObjectKey(format!("{what} cannot be empty")));
    }
    if value.len() > MAX_COMPONENT_LEN {
        return Err(VaultError::InvalidObjectKey(format!(
            "{what} cannot exceed {MAX_COMPONENT_LEN} characters"
        )));
    }
    if value.starts_with('.') {
        return Err(VaultError::InvalidObjectKey(format!(
            "{what} '{value}' cannot start with a dot"
        )));
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.'))
    {
        return Err(VaultError::InvalidObjectKey(format!(
            "{what} '{value}' contains invalid characters"
        )));
    }
    Ok(())
}
