//! Named-parameter bags for key derivation.
//!
//! Options are an unordered map from string keys to typed values.  Each
//! algorithm reads what it needs through `get_as_int` / `get_as_string`,
//! which distinguish a missing key from a key of the wrong type.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};

/// PBKDF2 iteration count.
pub const ITERATIONS: &str = "iterations";
/// PBKDF2 HMAC hash function name (`SHA1`, `SHA256`, `SHA384`, `SHA512`).
pub const HASH: &str = "hash";
/// Output length in bytes.
pub const LENGTH: &str = "length";
/// Argon2id memory cost in KiB.
pub const MEMORY_KIB: &str = "memory_kib";
/// Argon2id pass count.
pub const TIME_COST: &str = "time_cost";
/// Argon2id lanes.
pub const PARALLELISM: &str = "parallelism";

/// A typed option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Int(i64),
    Str(String),
}

impl OptionValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Str(_) => "string",
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for OptionValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// A named bag of key-derivation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfOptions {
    name: String,
    values: HashMap<String, OptionValue>,
}

impl KdfOptions {
    /// An empty bag with the given preset name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: HashMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<OptionValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<OptionValue>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a string option.
    pub fn get_as_string(&self, key: &str) -> Result<&str> {
        match self.lookup(key)? {
            OptionValue::Str(v) => Ok(v),
            other => Err(self.wrong_type(key, "string", other)),
        }
    }

    /// Look up an integer option.
    pub fn get_as_int(&self, key: &str) -> Result<i64> {
        match self.lookup(key)? {
            OptionValue::Int(v) => Ok(*v),
            other => Err(self.wrong_type(key, "int", other)),
        }
    }

    /// Integer option that must fit in a `u32` and be at least `min`.
    pub(crate) fn get_as_u32(&self, key: &str, min: u32) -> Result<u32> {
        let raw = self.get_as_int(key)?;
        let value = u32::try_from(raw).map_err(|_| {
            VaultError::KeyDerivationFailed(format!("option '{key}' out of range: {raw}"))
        })?;
        if value < min {
            return Err(VaultError::KeyDerivationFailed(format!(
                "option '{key}' must be at least {min} (got {value})"
            )));
        }
        Ok(value)
    }

    fn lookup(&self, key: &str) -> Result<&OptionValue> {
        self.values
            .get(key)
            .ok_or_else(|| VaultError::OptionNotFound(key.to_string()))
    }

    fn wrong_type(&self, key: &str, expected: &'static str, found: &OptionValue) -> VaultError {
        VaultError::OptionInvalidType {
            key: key.to_string(),
            expected,
            actual: found.type_name(),
        }
    }

    // ------------------------------------------------------------------
    // Presets
    // ------------------------------------------------------------------

    /// PBKDF2-HMAC-SHA256, 100 000 iterations, 32-byte output.
    pub fn pbkdf2_default() -> Self {
        Self::new("pbkdf2-default")
            .with(ITERATIONS, 100_000u32)
            .with(HASH, "SHA256")
            .with(LENGTH, 32u32)
    }

    /// Reduced-cost PBKDF2 for automated tests only.
    pub fn pbkdf2_test() -> Self {
        Self::new("pbkdf2-test")
            .with(ITERATIONS, 1_000u32)
            .with(HASH, "SHA256")
            .with(LENGTH, 32u32)
    }

    /// Argon2id with 64 MB memory, 3 passes, 4 lanes, 32-byte output.
    pub fn argon2id_default() -> Self {
        Self::new("argon2id-default")
            .with(MEMORY_KIB, 65_536u32)
            .with(TIME_COST, 3u32)
            .with(PARALLELISM, 4u32)
            .with(LENGTH, 32u32)
    }

    /// Reduced-cost Argon2id for automated tests only.
    pub fn argon2id_test() -> Self {
        Self::new("argon2id-test")
            .with(MEMORY_KIB, 8_192u32)
            .with(TIME_COST, 1u32)
            .with(PARALLELISM, 1u32)
            .with(LENGTH, 32u32)
    }
}
